use std::sync::Mutex;
use strata::{
    Database, Entity, EntityKey, EntitySql, ModuloShardingRule, ShardingList, Value, Where,
};

#[derive(EntityKey, Default, Debug, Clone, PartialEq)]
struct MembershipKey {
    team_id: i64,
    user_id: i64,
}

#[derive(Entity, Default, Debug, Clone, PartialEq)]
struct Membership {
    #[strata(primary_key)]
    key: MembershipKey,
    #[strata(default = "guest")]
    role: Option<String>,
    active: bool,
}

#[derive(Entity, Default, Debug, Clone, PartialEq)]
#[strata(table_name = "ledger", sharding_rule = ModuloShardingRule::new(2))]
struct LedgerEntry {
    #[strata(id)]
    id: i64,
    amount: i64,
}

static MUTEX: Mutex<()> = Mutex::new(());

fn membership(team_id: i64, user_id: i64, role: Option<&str>) -> Membership {
    Membership {
        key: MembershipKey { team_id, user_id },
        role: role.map(Into::into),
        active: true,
    }
}

pub fn members(database: &Database) {
    let _lock = MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    // Setup
    database
        .session(|session| {
            session.drop_table::<Membership>(None)?;
            session.create_table::<Membership>(None)?;
            for shard in [0, 1] {
                let shard = Value::Int32(Some(shard));
                session.drop_table::<LedgerEntry>(Some(&shard))?;
                session.create_table::<LedgerEntry>(Some(&shard))?;
            }
            Ok(())
        })
        .expect("Failed to create the Membership and LedgerEntry tables");

    // Composite keys
    let mut memberships = vec![
        membership(1, 10, Some("owner")),
        membership(1, 11, None),
        membership(2, 10, None),
    ];
    database
        .session(|session| session.insert_all(&mut memberships, None))
        .expect("Failed to insert the memberships");
    let found = database
        .session(|session| {
            session.find_by_id(
                &EntitySql::<Membership>::create(),
                &MembershipKey {
                    team_id: 1,
                    user_id: 11,
                },
            )
        })
        .expect("Failed to query a membership")
        .expect("Failed to find a membership");
    assert_eq!(found.role.as_deref(), Some("guest"));
    assert!(found.active);
    let mut owner = memberships[0].clone();
    owner.active = false;
    let updated = database
        .session(|session| session.update(&owner, None).map(|v| v.is_some()))
        .expect("Failed to update the owner");
    assert!(updated);
    let counts = database
        .session(|session| {
            session.delete_by_ids::<Membership>(&[
                MembershipKey {
                    team_id: 2,
                    user_id: 10,
                },
                MembershipKey {
                    team_id: 2,
                    user_id: 11,
                },
            ])
        })
        .expect("Failed to delete memberships");
    assert_eq!(counts, [1, 0]);
    let remaining = database
        .session(|session| {
            session.find_where(&EntitySql::<Membership>::create(), Where::empty(), None)
        })
        .expect("Failed to query the memberships");
    assert_eq!(remaining.len(), 2);
    assert!(remaining.rows.contains(&owner));

    // Shards
    let mut entries = ShardingList::new()
        .add(4, LedgerEntry { id: 1, amount: 100 })
        .add(5, LedgerEntry { id: 2, amount: -40 })
        .add(7, LedgerEntry { id: 3, amount: 15 });
    database
        .session(|session| session.insert_sharded(&mut entries, None))
        .expect("Failed to insert the ledger entries");
    let (even, odd) = database
        .session(|session| {
            let even = Value::Int32(Some(0));
            let odd = Value::Int32(Some(1));
            Ok((
                session.count_sharded::<LedgerEntry>(&Where::empty(), Some(&even))?,
                session.count_sharded::<LedgerEntry>(&Where::empty(), Some(&odd))?,
            ))
        })
        .expect("Failed to count the ledger entries");
    assert_eq!((even, odd), (1, 2));
    let deleted = database
        .session(|session| session.delete_sharded(&entries).map(|v| v.len()))
        .expect("Failed to delete the ledger entries");
    assert_eq!(deleted, 3);

    database
        .session(|session| {
            session.drop_table::<Membership>(None)?;
            for shard in [0, 1] {
                session.drop_table::<LedgerEntry>(Some(&Value::Int32(Some(shard))))?;
            }
            Ok(())
        })
        .expect("Failed to drop the Membership and LedgerEntry tables");
}
