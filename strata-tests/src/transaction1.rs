use std::sync::Mutex;
use strata::{Database, Entity, Error, Result, Transactions, Where};

#[derive(Entity, Default, Debug, Clone, PartialEq)]
struct EntityA {
    #[strata(id, auto_increment)]
    id: Option<i64>,
    name: String,
    field: i64,
}

static MUTEX: Mutex<()> = Mutex::new(());

fn entities(names: &[&str]) -> Vec<EntityA> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| EntityA {
            id: None,
            name: (*name).into(),
            field: i as i64 * 100,
        })
        .collect()
}

fn count(database: &Database) -> u64 {
    database
        .session(|session| session.count::<EntityA>(&Where::empty()))
        .expect("Failed to count EntityA")
}

pub fn transaction1(database: &Database) {
    let _lock = MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    // Setup
    database
        .session(|session| {
            session.drop_table::<EntityA>(None)?;
            session.create_table::<EntityA>(None)
        })
        .expect("Failed to create the EntityA table");

    // Commit
    let inside = Transactions::execute(|| {
        let mut first = entities(&["first entity", "second entity", "third entity"]);
        database.session(|session| session.insert_all(&mut first, None))?;
        let mut second = entities(&["fourth entity"]);
        database.session(|session| session.insert_all(&mut second, None))?;
        assert_eq!(Transactions::level(), 1);
        database.session(|session| session.count::<EntityA>(&Where::empty()))
    })
    .expect("Failed to commit the transaction");
    assert_eq!(inside, 4);
    assert!(!Transactions::is_active());
    assert_eq!(count(database), 4);

    // Rollback
    let result: Result<()> = Transactions::execute(|| {
        let mut more = entities(&["fifth entity", "sixth entity"]);
        database.session(|session| session.insert_all(&mut more, None))?;
        assert_eq!(
            database.session(|session| session.count::<EntityA>(&Where::empty()))?,
            6
        );
        Err(Error::msg("Abort the transaction"))
    });
    assert!(result.is_err());
    assert_eq!(count(database), 4);

    // Nested levels commit with the outermost one
    Transactions::execute(|| {
        Transactions::execute(|| {
            let mut inner = entities(&["inner entity"]);
            database.session(|session| session.insert_all(&mut inner, None))
        })?;
        assert_eq!(Transactions::level(), 1);
        Ok(())
    })
    .expect("Failed to commit the nested transaction");
    assert_eq!(count(database), 5);

    database
        .session(|session| session.drop_table::<EntityA>(None))
        .expect("Failed to drop the EntityA table");
}
