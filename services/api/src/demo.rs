use crate::infra::Engine;
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::Args;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use storefront_crm::clock::{Clock, FixedClock};
use storefront_crm::config::{DispatchConfig, LoyaltyConfig};
use storefront_crm::engine::campaigns::{
    Campaign, CampaignId, CampaignRequest, CampaignStore, CampaignTarget, MessageTemplate,
};
use storefront_crm::engine::coupons::{CouponDraft, CouponQuery, RedeemCoupon};
use storefront_crm::engine::customers::{
    AggregateImporter, ClassifiedCustomer, CustomerId, CustomerRecord, CustomerStore,
};
use storefront_crm::engine::rfm::RfmScorer;
use storefront_crm::error::AppError;

#[derive(Args, Debug)]
pub(crate) struct ClassifyArgs {
    /// CSV with columns customer_id,name,days_since_last_purchase,order_count,total_spent
    #[arg(long)]
    pub(crate) csv: PathBuf,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Business date for the demo (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Skip the birthday campaign portion of the demo.
    #[arg(long)]
    pub(crate) skip_campaign: bool,
}

pub(crate) fn run_classify(args: ClassifyArgs) -> Result<(), AppError> {
    let rows = AggregateImporter::from_path(&args.csv, &RfmScorer::default())?;
    render_classification(&rows);
    Ok(())
}

fn render_classification(rows: &[ClassifiedCustomer]) {
    println!("Classified {} customers", rows.len());
    println!("{:<14} {:<20} {:>3} {:>3} {:>3}  Segment", "Customer", "Name", "R", "F", "M");
    for row in rows {
        println!(
            "{:<14} {:<20} {:>3} {:>3} {:>3}  {}",
            row.customer_id,
            row.name,
            row.score.recency,
            row.score.frequency,
            row.score.monetary,
            row.segment.label()
        );
    }

    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for row in rows {
        *counts.entry(row.segment.label()).or_default() += 1;
    }
    println!();
    for (label, count) in counts {
        println!("- {label}: {count}");
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let now = Utc.from_utc_datetime(&today.and_time(NaiveTime::MIN)) + Duration::hours(10);
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(now));
    let engine = Engine::in_memory(clock, DispatchConfig::default(), LoyaltyConfig::default());

    println!("Storefront CRM demo for {today}");
    println!("===============================");

    seed_customers(&engine, today).await?;

    println!("\nSegments");
    let report = engine.segmentation.recompute_all().await?;
    println!("Evaluated {} customers", report.evaluated);
    for entry in report.segments.iter().filter(|entry| entry.customers > 0) {
        println!("- {}: {}", entry.segment_label, entry.customers);
    }
    let customers = CustomerStore::list(engine.store.as_ref()).await?;
    for customer in &customers {
        let segment = customer
            .segment
            .map(|segment| segment.label())
            .unwrap_or("unscored");
        println!("  {:<8} {:<10} {segment}", customer.id, customer.name);
    }

    println!("\nLoyalty");
    let ploy = CustomerId::new("c-ploy");
    if let Some(receipt) = engine
        .ledger
        .award_order(&ploy, "ord-1001", Decimal::from(1_250))
        .await?
    {
        println!(
            "Order ord-1001 earned {} points (balance {})",
            receipt.transaction.delta, receipt.balance
        );
    }
    let receipt = engine
        .ledger
        .redeem(&ploy, 20, Some("ord-1002".to_string()), None)
        .await?;
    println!("Redeemed 20 points (balance {})", receipt.balance);
    let summary = engine.ledger.summary(&ploy).await?;
    println!(
        "Summary: earned {} redeemed {} balance {} tier {}",
        summary.earned,
        summary.redeemed,
        summary.balance,
        summary.tier.label()
    );

    println!("\nCoupons");
    let mut draft = CouponDraft::percentage("WELCOME10", Decimal::from(10));
    draft.max_discount = Some(Decimal::from(200));
    draft.per_customer_limit = Some(1);
    let coupon = engine.coupons.create(draft).await?;
    println!("Created {} ({})", coupon.code, coupon.id);

    let cart_total = Decimal::from(3_000);
    let decision = engine
        .coupons
        .validate(&CouponQuery {
            code: "welcome10".to_string(),
            customer_id: Some(ploy.clone()),
            cart_total,
        })
        .await?;
    let view = decision.view();
    match (view.discount, view.final_total) {
        (Some(discount), Some(final_total)) => {
            println!("Cart {cart_total}: discount {discount}, pay {final_total}")
        }
        _ => println!(
            "Cart {cart_total}: rejected ({})",
            view.error.unwrap_or_default()
        ),
    }
    let redemption = engine
        .coupons
        .redeem(RedeemCoupon {
            code: "WELCOME10".to_string(),
            customer_id: ploy.clone(),
            order_id: "ord-1003".to_string(),
            cart_total,
        })
        .await?;
    println!(
        "Redeemed on {} (uses so far: {})",
        redemption.order_id, redemption.usage_count
    );
    let second = engine
        .coupons
        .validate(&CouponQuery {
            code: "WELCOME10".to_string(),
            customer_id: Some(ploy.clone()),
            cart_total,
        })
        .await?;
    println!(
        "Second attempt: {}",
        second.view().error.unwrap_or_else(|| "accepted".to_string())
    );

    if args.skip_campaign {
        return Ok(());
    }

    println!("\nBirthday campaign");
    let campaign_id = CampaignId::new("cmp-birthday");
    engine
        .store
        .insert_campaign(Campaign::new("cmp-birthday", "Birthday week"))
        .await?;
    let target = CampaignTarget::Birthday { days_ahead: 7 };
    let preview = engine.campaigns.preview(&target).await?;
    for recipient in &preview.recipients {
        println!(
            "- {} in {} day(s)",
            recipient.name,
            recipient.days_until.unwrap_or_default()
        );
    }

    let request = CampaignRequest {
        target,
        template: MessageTemplate::new("Happy birthday {{name}}! You have {{points}} points.")
            .with_subject("A birthday treat"),
        campaign_id: Some(campaign_id),
    };
    let dispatch = engine.campaigns.run(&request).await?;
    println!(
        "Sent {} failed {} skipped {} (line {}, email {})",
        dispatch.sent,
        dispatch.failed,
        dispatch.skipped,
        dispatch.channels.line,
        dispatch.channels.email
    );
    for delivery in engine.outbox.deliveries() {
        let subject = delivery
            .subject
            .map(|subject| format!(" \"{subject}\""))
            .unwrap_or_default();
        println!(
            "  [{}] {}{subject}: {}",
            delivery.channel.label(),
            delivery.address,
            delivery.body
        );
    }

    Ok(())
}

/// Six storefront customers spread across the segments, two with birthdays this week.
pub(crate) async fn seed_customers(engine: &Engine, today: NaiveDate) -> Result<(), AppError> {
    let now = Utc.from_utc_datetime(&today.and_time(NaiveTime::MIN));
    let records = [
        birthday_in(
            CustomerRecord::new("c-ploy", "Ploy")
                .with_line_user_id("U-ploy")
                .with_orders(12, Decimal::from(58_000), now - Duration::days(9)),
            today,
            3,
        ),
        birthday_in(
            CustomerRecord::new("c-arun", "Arun")
                .with_email("arun@example.com")
                .with_orders(7, Decimal::from(14_500), now - Duration::days(150)),
            today,
            5,
        ),
        CustomerRecord::new("c-mint", "Mint")
            .with_email("mint@example.com")
            .with_orders(1, Decimal::from(690), now - Duration::days(4)),
        CustomerRecord::new("c-nok", "Nok")
            .with_line_user_id("U-nok")
            .with_orders(9, Decimal::from(31_000), now - Duration::days(300)),
        birthday_in(
            CustomerRecord::new("c-tao", "Tao").with_orders(
                2,
                Decimal::from(1_100),
                now - Duration::days(420),
            ),
            today,
            6,
        ),
        CustomerRecord::new("c-fah", "Fah")
            .with_email("fah@example.com")
            .with_orders(4, Decimal::from(6_400), now - Duration::days(45)),
    ];

    for record in records {
        CustomerStore::insert(engine.store.as_ref(), record).await?;
    }
    Ok(())
}

fn birthday_in(record: CustomerRecord, today: NaiveDate, days: i64) -> CustomerRecord {
    let upcoming = today + Duration::days(days);
    match upcoming.with_year(1992) {
        Some(birthday) => record.with_birthday(birthday),
        None => record,
    }
}
