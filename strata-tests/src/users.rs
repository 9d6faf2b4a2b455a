use std::sync::Mutex;
use strata::{
    BatchSql, Cond, Database, Entity, EntitySql, Fields, MapHandler, OrderBy, Page, Sql, Value,
    Where,
};

#[derive(Entity, Default, Debug, Clone, PartialEq)]
struct UserProfile {
    #[strata(id, auto_increment)]
    id: Option<i64>,
    name: String,
    email: Option<String>,
    #[strata(default = "18")]
    age: Option<i32>,
}

impl UserProfile {
    fn new(name: &str, age: i32) -> Self {
        Self {
            name: name.into(),
            email: Some(format!("{}@example.com", name)),
            age: Some(age),
            ..Default::default()
        }
    }
}

static MUTEX: Mutex<()> = Mutex::new(());

pub fn users(database: &Database) {
    let _lock = MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    // Setup
    database
        .session(|session| {
            session.drop_table::<UserProfile>(None)?;
            session.create_table::<UserProfile>(None)
        })
        .expect("Failed to create the UserProfile table");

    // Insert with generated keys
    let mut users = vec![
        UserProfile::new("alice", 31),
        UserProfile::new("bob", 17),
        UserProfile::new("carol", 45),
        UserProfile::new("dave", 22),
        UserProfile::new("erin", 58),
    ];
    let counts = database
        .session(|session| session.insert_all(&mut users, None))
        .expect("Failed to insert the users");
    assert_eq!(counts, [1, 1, 1, 1, 1]);
    let ids = users
        .iter()
        .map(|v| v.id.expect("Every user should have received a key"))
        .collect::<Vec<_>>();
    assert!(ids.windows(2).all(|v| v[0] < v[1]));

    // Default applied to a missing value
    let mut frank = UserProfile {
        name: "frank".into(),
        ..Default::default()
    };
    database
        .session(|session| session.insert(&mut frank, None))
        .expect("Failed to insert frank");
    let frank_id = frank.id.expect("Frank should have received a key");
    let found = database
        .session(|session| session.find_by_id(&EntitySql::<UserProfile>::create(), &frank.id))
        .expect("Failed to query frank")
        .expect("Failed to find frank");
    assert_eq!(found.id, Some(frank_id));
    assert_eq!(found.age, Some(18));
    assert_eq!(found.email, None);

    // Filters, ordering and paging
    let adults = Where::create(Cond::create().gt_eq("age").param(18))
        .order_by(OrderBy::create().desc("age").asc("name"));
    let page = database
        .session(|session| {
            session.find_where(
                &EntitySql::<UserProfile>::create(),
                adults.clone(),
                Some(Page::of(1, 2, true)),
            )
        })
        .expect("Failed to query the first page");
    assert_eq!(page.record_count, 5);
    assert_eq!(page.page_count, 3);
    assert_eq!(
        page.rows.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
        ["erin", "carol"]
    );
    let page = database
        .session(|session| {
            session.find_where(
                &EntitySql::<UserProfile>::create(),
                adults.clone(),
                Some(Page::of(3, 2, true)),
            )
        })
        .expect("Failed to query the last page");
    assert_eq!(
        page.rows.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
        ["frank"]
    );
    let none = database
        .session(|session| {
            session.find_where(
                &EntitySql::<UserProfile>::create(),
                Where::create(Cond::create().gt("age").param(200)),
                Some(Page::create(1)),
            )
        })
        .expect("Failed to query an empty page");
    assert!(none.is_empty());
    assert_eq!(none.record_count, 0);
    let youngest = database
        .session(|session| {
            session.find_first_where(
                &EntitySql::<UserProfile>::create(),
                Where::empty().order_by(OrderBy::create().asc("age")),
            )
        })
        .expect("Failed to query the youngest")
        .expect("Failed to find the youngest");
    assert_eq!(youngest.name, "bob");

    // Selected fields
    let names = database
        .session(|session| {
            session.find_where(
                &EntitySql::<UserProfile>::create().fields(Fields::excluding(["email"])),
                Where::empty().order_by(OrderBy::create().asc("id")),
                None,
            )
        })
        .expect("Failed to query without emails");
    assert_eq!(names.len(), 6);
    assert!(names.rows.iter().all(|v| v.email.is_none()));
    assert_eq!(names.rows[0].age, Some(31));

    // Example
    let example = UserProfile {
        name: "carol".into(),
        age: None,
        ..Default::default()
    };
    let found = database
        .session(|session| session.find_by_example(&example, None, None))
        .expect("Failed to query by example");
    assert_eq!(found.rows, [users[2].clone()]);

    // Counts
    let count = database
        .session(|session| {
            session.count::<UserProfile>(&Where::create(Cond::create().lt("age").param(30)))
        })
        .expect("Failed to count");
    assert_eq!(count, 3);

    // Update limited to some fields
    let mut bob = users[1].clone();
    bob.email = Some("robert@example.com".into());
    bob.age = Some(99);
    let updated = database
        .session(|session| {
            session
                .update(&bob, Some(&Fields::of(["email"])))
                .map(|v| v.is_some())
        })
        .expect("Failed to update bob");
    assert!(updated);
    let found = database
        .session(|session| session.find_by_id(&EntitySql::<UserProfile>::create(), &bob.id))
        .expect("Failed to query bob")
        .expect("Failed to find bob");
    assert_eq!(found.email.as_deref(), Some("robert@example.com"));
    assert_eq!(found.age, Some(17));

    // Raw statements
    let sql = Sql::create(r#"SELECT "name", "age" FROM "user_profile" WHERE "age" >= ? ORDER BY "name""#)
        .param(40);
    let rows = database
        .session(|session| session.find(&sql, MapHandler))
        .expect("Failed to run the raw query");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.rows[0]["name"], Value::Varchar(Some("carol".into())));
    assert_eq!(rows.rows[1]["age"], Value::Int64(Some(58)));
    assert_eq!(
        database
            .session(|session| session.count_sql(&sql))
            .expect("Failed to count the raw query"),
        2
    );
    let batch = BatchSql::with_sql(r#"UPDATE "user_profile" SET "age" = "age" + ? WHERE "id" = ?"#)
        .add_params(strata::params![1, ids[0]])
        .add_params(strata::params![1, -1])
        .add_statement(r#"UPDATE "user_profile" SET "email" = NULL WHERE "name" = 'erin'"#);
    let counts = database
        .session(|session| session.execute_batch(batch))
        .expect("Failed to execute the batch");
    assert_eq!(counts, [1, 0, 1]);

    // Deletes
    let deleted = database
        .session(|session| session.delete(&users[0]).map(|v| v.is_some()))
        .expect("Failed to delete alice");
    assert!(deleted);
    let counts = database
        .session(|session| {
            session.delete_by_ids::<UserProfile>(&[users[2].id, Some(-1), users[3].id])
        })
        .expect("Failed to delete by ids");
    assert_eq!(counts, [1, 0, 1]);
    assert_eq!(
        database
            .session(|session| session.delete_by_id::<UserProfile>(&Some(frank_id)))
            .expect("Failed to delete frank"),
        1
    );
    let remaining = database
        .session(|session| session.count::<UserProfile>(&Where::empty()))
        .expect("Failed to count the remaining users");
    assert_eq!(remaining, 2);

    database
        .session(|session| session.drop_table::<UserProfile>(None))
        .expect("Failed to drop the UserProfile table");
}
