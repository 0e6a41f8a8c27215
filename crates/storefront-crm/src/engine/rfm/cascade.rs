use super::{RfmScore, Segment};

/// One row of the segment table: a predicate over the score triplet and the segment it yields.
#[derive(Debug, Clone, Copy)]
pub struct SegmentRule {
    pub segment: Segment,
    pub condition: &'static str,
    predicate: fn(&RfmScore) -> bool,
}

impl SegmentRule {
    pub fn matches(&self, score: &RfmScore) -> bool {
        (self.predicate)(score)
    }
}

/// Evaluated top to bottom, first match wins. The bands overlap, so the order is part of the
/// contract; anything that falls through every row is `Others`.
pub const SEGMENT_RULES: [SegmentRule; 7] = [
    SegmentRule {
        segment: Segment::Champion,
        condition: "r>=4 & f>=4 & m>=4",
        predicate: champion,
    },
    SegmentRule {
        segment: Segment::Loyal,
        condition: "r>=3 & f>=3 & m>=3",
        predicate: loyal,
    },
    SegmentRule {
        segment: Segment::NewCustomer,
        condition: "r>=4 & f<=2",
        predicate: new_customer,
    },
    SegmentRule {
        segment: Segment::Promising,
        condition: "r>=3 & f>=3 & m<=2",
        predicate: promising,
    },
    SegmentRule {
        segment: Segment::AtRisk,
        condition: "r<=2 & f>=3",
        predicate: at_risk,
    },
    SegmentRule {
        segment: Segment::CantLose,
        condition: "r<=2 & f<=2 & m>=3",
        predicate: cant_lose,
    },
    SegmentRule {
        segment: Segment::Hibernating,
        condition: "r<=2 & f<=2",
        predicate: hibernating,
    },
];

fn champion(s: &RfmScore) -> bool {
    s.recency >= 4 && s.frequency >= 4 && s.monetary >= 4
}

fn loyal(s: &RfmScore) -> bool {
    s.recency >= 3 && s.frequency >= 3 && s.monetary >= 3
}

fn new_customer(s: &RfmScore) -> bool {
    s.recency >= 4 && s.frequency <= 2
}

fn promising(s: &RfmScore) -> bool {
    s.recency >= 3 && s.frequency >= 3 && s.monetary <= 2
}

fn at_risk(s: &RfmScore) -> bool {
    s.recency <= 2 && s.frequency >= 3
}

fn cant_lose(s: &RfmScore) -> bool {
    s.recency <= 2 && s.frequency <= 2 && s.monetary >= 3
}

fn hibernating(s: &RfmScore) -> bool {
    s.recency <= 2 && s.frequency <= 2
}

/// Returns the segment together with the table row that produced it (`None` for `Others`).
pub fn classify_with_rule(score: &RfmScore) -> (Segment, Option<&'static SegmentRule>) {
    match SEGMENT_RULES.iter().find(|rule| rule.matches(score)) {
        Some(rule) => (rule.segment, Some(rule)),
        None => (Segment::Others, None),
    }
}

pub fn classify(score: &RfmScore) -> Segment {
    classify_with_rule(score).0
}
