use rust_decimal::Decimal;
use std::{str::FromStr, sync::Mutex};
use strata::{Database, Entity, EntitySql};
use time::{Date, Month, PrimitiveDateTime, Time};
use uuid::Uuid;

#[derive(Entity, Default, Debug, PartialEq)]
struct SimpleFields {
    #[strata(id)]
    id: i64,
    alpha: Option<u8>,
    bravo: Option<i32>,
    charlie: Option<i16>,
    delta: Option<u64>,
    echo: Option<Uuid>,
    foxtrot: Option<bool>,
    golf: Option<Time>,
    hotel: Option<String>,
    india: Option<Decimal>,
    juliet: Option<f64>,
    kilo: Option<Date>,
    lima: Option<PrimitiveDateTime>,
    mike: Option<Vec<u8>>,
}

static MUTEX: Mutex<()> = Mutex::new(());

pub fn simple(database: &Database) {
    let _lock = MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    // Setup
    database
        .session(|session| {
            session.drop_table::<SimpleFields>(None)?;
            session.create_table::<SimpleFields>(None)
        })
        .expect("Failed to create the SimpleFields table");

    // Every value set
    let date = Date::from_calendar_date(2024, Month::February, 29).expect("Invalid date");
    let mut first = SimpleFields {
        id: 1,
        alpha: Some(255),
        bravo: Some(777),
        charlie: Some(-2),
        delta: Some(9876543210),
        echo: Some(Uuid::parse_str("5e915574-bb30-4430-98cf-c5854f61fbbd").expect("Invalid uuid")),
        foxtrot: Some(true),
        golf: Some(Time::from_hms_milli(9, 5, 10, 250).expect("Invalid time")),
        hotel: Some("Hello world!".into()),
        india: Some(Decimal::from_str("12345.6789").expect("Invalid decimal")),
        juliet: Some(-0.125),
        kilo: Some(date),
        lima: Some(PrimitiveDateTime::new(
            date,
            Time::from_hms(23, 59, 1).expect("Invalid time"),
        )),
        mike: Some(vec![0, 1, 2, 254, 255]),
    };
    let inserted = database
        .session(|session| session.insert(&mut first, None))
        .expect("Failed to insert simple 1");
    assert_eq!(inserted, 1);
    let found = database
        .session(|session| session.find_by_id(&EntitySql::<SimpleFields>::create(), &1))
        .expect("Failed to query simple 1")
        .expect("Failed to find simple 1");
    assert_eq!(found, first);

    // Nothing set
    let mut second = SimpleFields {
        id: 2,
        ..Default::default()
    };
    database
        .session(|session| session.insert(&mut second, None))
        .expect("Failed to insert simple 2");
    let found = database
        .session(|session| session.find_by_id(&EntitySql::<SimpleFields>::create(), &2))
        .expect("Failed to query simple 2")
        .expect("Failed to find simple 2");
    assert_eq!(found, second);

    // Update back and forth
    let mut third = found;
    third.hotel = Some("updated".into());
    third.bravo = Some(-1);
    let updated = database
        .session(|session| session.update(&third, None).map(|v| v.is_some()))
        .expect("Failed to update simple 2");
    assert!(updated, "Simple 2 should have been updated");
    let found = database
        .session(|session| session.find_by_id(&EntitySql::<SimpleFields>::create(), &2))
        .expect("Failed to query simple 2")
        .expect("Failed to find simple 2");
    assert_eq!(found.hotel.as_deref(), Some("updated"));
    assert_eq!(found.bravo, Some(-1));
    assert_eq!(found.alpha, None);
    assert_eq!(
        database
            .session(|session| session.find_by_id(&EntitySql::<SimpleFields>::create(), &3))
            .expect("Failed to query simple 3"),
        None
    );

    database
        .session(|session| session.drop_table::<SimpleFields>(None))
        .expect("Failed to drop the SimpleFields table");
}
