mod common;

#[cfg(test)]
mod tests {
    use crate::common::{ActiveUser, Call, Member, MemberKey, User, database, row};
    use strata::{
        BatchSql, Cond, DbLocker, EntitySql, ErrorKind, Fields, KeyRequest, MapHandler, OrderBy,
        Page, Session, Sql, Value, ValuesHandler, Where, params,
    };

    fn users(names: &[&str]) -> Vec<User> {
        names.iter().map(|v| User::named(v)).collect()
    }

    #[test]
    fn insert_copies_generated_key() {
        let (database, driver) = database("sqlite://memory");
        let mut user = User::named("a");
        let count = database
            .session(|session| session.insert(&mut user, None))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(user.id, Some(1));
        let journal = driver.journal();
        assert_eq!(
            journal.sql(),
            [r#"INSERT INTO "user" ("name", "email", "age") VALUES (?, ?, ?)"#]
        );
        assert_eq!(
            journal.statements[0].params[0],
            params!["a", Value::Varchar(None), 18]
        );
    }

    #[test]
    fn insert_keeps_assigned_key() {
        let (database, driver) = database("sqlite://memory");
        driver.journal().next_key = 50;
        let mut user = User {
            id: Some(7),
            name: "b".into(),
            email: Some("b@example.com".into()),
            age: Some(30),
        };
        database
            .session(|session| session.insert(&mut user, None))
            .unwrap();
        assert_eq!(user.id, Some(7));
    }

    #[test]
    fn insert_all_assigns_keys_in_order() {
        let (database, driver) = database("sqlite://memory");
        let mut users = users(&["a", "b", "c", "d"]);
        let counts = database
            .session(|session| session.insert_all(&mut users, None))
            .unwrap();
        assert_eq!(counts, [1, 1, 1, 1]);
        assert_eq!(
            users.iter().map(|v| v.id).collect::<Vec<_>>(),
            [Some(1), Some(2), Some(3), Some(4)]
        );
        let journal = driver.journal();
        assert_eq!(journal.statements.len(), 1);
        assert_eq!(journal.statements[0].call, Call::Batch);
        assert_eq!(journal.statements[0].params.len(), 4);
    }

    #[test]
    fn insert_all_leaves_unreported_keys_unset() {
        let (database, driver) = database("sqlite://memory");
        {
            let mut journal = driver.journal();
            journal.keyless = 1;
            journal.next_key = 9;
        }
        let mut users = users(&["a", "b"]);
        database
            .session(|session| session.insert_all(&mut users, None))
            .unwrap();
        assert_eq!(
            users.iter().map(|v| v.id).collect::<Vec<_>>(),
            [None, Some(9)]
        );
    }

    #[test]
    fn insert_names_key_columns_without_generated_key_support() {
        let (database, driver) = database("oracle://scott@localhost/xe");
        driver.journal().next_key = 3;
        let mut user = User::named("a");
        database
            .session(|session| session.insert(&mut user, None))
            .unwrap();
        assert_eq!(user.id, Some(3));
        let journal = driver.journal();
        assert_eq!(
            journal.statements[0].keys,
            KeyRequest::Columns(vec!["id".to_string()])
        );
        assert!(!journal.statements[0].sql.contains("\"id\""));
    }

    #[test]
    fn insert_with_field_filter() {
        let (database, driver) = database("mysql://app@localhost/app");
        let mut user = User::named("a");
        database
            .session(|session| session.insert(&mut user, Some(&Fields::of(["name"]))))
            .unwrap();
        assert_eq!(
            driver.journal().sql(),
            ["INSERT INTO `user` (`name`) VALUES (?)"]
        );
    }

    #[test]
    fn empty_page_skips_the_select() {
        let (database, driver) = database("sqlite://memory");
        driver.journal().respond_count(0);
        let result = database
            .session(|session| {
                session.find_where(
                    &EntitySql::<User>::create(),
                    Where::create(Cond::create().eq("name").param("a")),
                    Some(Page::of(1, 10, true)),
                )
            })
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(result.record_count, 0);
        assert_eq!(result.page_count, 0);
        let journal = driver.journal();
        assert_eq!(
            journal.sql(),
            [r#"SELECT count(*) FROM "user" WHERE name = ?"#]
        );
        assert_eq!(journal.statements[0].params[0], params!["a"]);
    }

    #[test]
    fn paged_query_counts_first() {
        let (database, driver) = database("sqlite://memory");
        {
            let mut journal = driver.journal();
            journal.respond_count(25);
            journal.respond(vec![row(
                &["id", "name", "email", "age"],
                vec![
                    Value::Int64(Some(11)),
                    Value::Varchar(Some("k".into())),
                    Value::Null,
                    Value::Int64(Some(40)),
                ],
            )]);
        }
        let result = database
            .session(|session| {
                session.find_where(
                    &EntitySql::<User>::create().for_update(DbLocker::ForUpdate),
                    Where::create(Cond::create().gt("age").param(18))
                        .order_by(OrderBy::create().asc("id")),
                    Some(Page::of(2, 10, true)),
                )
            })
            .unwrap();
        assert_eq!(result.record_count, 25);
        assert_eq!(result.page_count, 3);
        assert_eq!(result.page_number, 2);
        assert_eq!(
            result.rows,
            [User {
                id: Some(11),
                name: "k".into(),
                email: None,
                age: Some(40),
            }]
        );
        assert_eq!(
            driver.journal().sql(),
            [
                r#"SELECT count(*) FROM "user" WHERE age > ?"#,
                r#"SELECT "id", "name", "email", "age" FROM "user" WHERE age > ? ORDER BY id ASC limit 10, 10 FOR UPDATE"#,
            ]
        );
    }

    #[test]
    fn raw_paged_query_on_postgres() {
        let (database, driver) = database("postgresql://app@localhost/app");
        {
            let mut journal = driver.journal();
            journal.respond_count(3);
            journal.respond(vec![row(&["id"], vec![Value::Int64(Some(3))])]);
        }
        let sql = Sql::create("SELECT id FROM users WHERE age > ?").param(18);
        let result = database
            .session(|session| session.find_paged(&sql, MapHandler, Page::of(2, 2, true)))
            .unwrap();
        assert_eq!(result.record_count, 3);
        assert_eq!(result.page_count, 2);
        assert_eq!(result.rows[0]["id"], Value::Int64(Some(3)));
        let journal = driver.journal();
        assert_eq!(
            journal.sql(),
            [
                "SELECT count(*) FROM (SELECT id FROM users WHERE age > ?) c_t",
                "SELECT id FROM users WHERE age > ? limit 2 offset 2",
            ]
        );
        assert_eq!(journal.statements[0].params, journal.statements[1].params);
    }

    #[test]
    fn find_first_limits_to_one_row() {
        let (database, driver) = database("sqlite://memory");
        driver
            .journal()
            .respond(vec![row(&["name"], vec![Value::Varchar(Some("x".into()))])]);
        let first = database
            .session(|session| {
                session.find_first(&Sql::create("SELECT name FROM users"), ValuesHandler)
            })
            .unwrap();
        assert_eq!(first, Some(vec![Value::Varchar(Some("x".into()))]));
        assert_eq!(driver.journal().sql(), ["SELECT name FROM users limit 0, 1"]);
    }

    #[test]
    fn update_all_is_one_batch() {
        let (database, driver) = database("sqlite://memory");
        let mut users = users(&["a", "b", "c"]);
        for (i, user) in users.iter_mut().enumerate() {
            user.id = Some(i as i64 + 1);
            user.email = Some(format!("{}@example.com", user.name));
        }
        let updated = database
            .session(|session| {
                session
                    .update_all(&users, Some(&Fields::of(["email"])))
                    .map(<[User]>::len)
            })
            .unwrap();
        assert_eq!(updated, 3);
        let journal = driver.journal();
        assert_eq!(journal.statements.len(), 1);
        let batch = &journal.statements[0];
        assert_eq!(batch.call, Call::Batch);
        assert_eq!(batch.sql, r#"UPDATE "user" SET "email" = ? WHERE "id" = ?"#);
        assert_eq!(
            batch.params,
            [
                params!["a@example.com", 1i64],
                params!["b@example.com", 2i64],
                params!["c@example.com", 3i64],
            ]
        );
    }

    #[test]
    fn update_binds_values_then_keys() {
        let (database, driver) = database("sqlite://memory");
        let user = User {
            id: Some(9),
            name: "n".into(),
            email: None,
            age: None,
        };
        let result = database
            .session(|session| session.update(&user, None).map(|v| v.is_some()))
            .unwrap();
        assert!(result);
        let journal = driver.journal();
        assert_eq!(
            journal.sql(),
            [r#"UPDATE "user" SET "name" = ?, "email" = ?, "age" = ? WHERE "id" = ?"#]
        );
        assert_eq!(
            journal.statements[0].params[0],
            params!["n", Value::Varchar(None), 18, 9i64]
        );
    }

    #[test]
    fn update_reports_missing_rows() {
        let (database, driver) = database("sqlite://memory");
        driver.journal().affected = 0;
        let user = User {
            id: Some(1),
            ..User::named("gone")
        };
        let updated = database
            .session(|session| Ok(session.update(&user, None)?.is_some()))
            .unwrap();
        assert!(!updated);
        let deleted = database
            .session(|session| Ok(session.delete(&user)?.is_some()))
            .unwrap();
        assert!(!deleted);
    }

    #[test]
    fn composite_key_binding_order() {
        let (database, driver) = database("sqlite://memory");
        let key = MemberKey {
            group_id: 4,
            user_id: 2,
        };
        database
            .session(|session| {
                session.find_by_id(&EntitySql::<Member>::create(), &key)?;
                session.delete_by_id::<Member>(&key)
            })
            .unwrap();
        let journal = driver.journal();
        assert_eq!(
            journal.sql(),
            [
                r#"SELECT "group_id", "user_id", "role" FROM "member" WHERE "group_id" = ? and "user_id" = ?"#,
                r#"DELETE FROM "member" WHERE "group_id" = ? and "user_id" = ?"#,
            ]
        );
        assert_eq!(journal.statements[0].params, journal.statements[1].params);
        assert_eq!(journal.statements[0].params[0], params![4i64, 2i64]);
    }

    #[test]
    fn composite_key_entity_roundtrip() {
        let (database, driver) = database("sqlite://memory");
        driver.journal().respond(vec![row(
            &["GROUP_ID", "USER_ID", "ROLE"],
            vec![
                Value::Int64(Some(1)),
                Value::Int64(Some(2)),
                Value::Varchar(Some("admin".into())),
            ],
        )]);
        let mut member = Member::default();
        member.key.group_id = 1;
        member.key.user_id = 2;
        let found = database
            .session(|session| {
                let found = session.find_by_id(&EntitySql::<Member>::create(), &member.key)?;
                session.insert(&mut member, None)?;
                Ok(found)
            })
            .unwrap();
        assert_eq!(
            found,
            Some(Member {
                key: MemberKey {
                    group_id: 1,
                    user_id: 2
                },
                role: Some("admin".into()),
            })
        );
        let journal = driver.journal();
        assert_eq!(
            journal.statements[1].sql,
            r#"INSERT INTO "member" ("group_id", "user_id", "role") VALUES (?, ?, ?)"#
        );
        assert_eq!(journal.statements[1].params[0], params![1i64, 2i64, "guest"]);
        assert!(journal.statements[1].keys.is_none());
    }

    #[test]
    fn delete_by_ids_follows_input_order() {
        let (database, driver) = database("sqlite://memory");
        let counts = database
            .session(|session| session.delete_by_ids::<User>(&[Some(3), Some(1), Some(2)]))
            .unwrap();
        assert_eq!(counts, [1, 1, 1]);
        let journal = driver.journal();
        assert_eq!(journal.statements[0].sql, r#"DELETE FROM "user" WHERE "id" = ?"#);
        assert_eq!(
            journal.statements[0].params,
            [params![3i64], params![1i64], params![2i64]]
        );
    }

    #[test]
    fn unknown_selected_column_is_a_mapping_error() {
        let (database, driver) = database("sqlite://memory");
        let error = database
            .session(|session| {
                session.find_by_id(
                    &EntitySql::<User>::create().fields(Fields::of(["id", "missing"])),
                    &Some(1i64),
                )
            })
            .unwrap_err();
        assert_eq!(ErrorKind::of(&error), ErrorKind::Mapping);
        assert!(format!("{error:#}").contains("'missing' isn't table field."));
        assert!(driver.journal().statements.is_empty());
    }

    #[test]
    fn views_are_read_only() {
        let (database, driver) = database("sqlite://memory");
        let mut view = ActiveUser::default();
        let session = database.open_session().unwrap();
        let error = session.insert(&mut view, None).unwrap_err();
        assert_eq!(ErrorKind::of(&error), ErrorKind::Configuration);
        assert!(error.to_string().contains("active_user"));
        let error = session.delete(&view).unwrap_err();
        assert_eq!(ErrorKind::of(&error), ErrorKind::Configuration);
        let error = session.update_all(&[view], None).unwrap_err();
        assert_eq!(ErrorKind::of(&error), ErrorKind::Configuration);
        assert!(
            session
                .find_where(&EntitySql::<ActiveUser>::create(), Where::empty(), None)
                .is_ok()
        );
        session.close();
        assert_eq!(driver.journal().sql(), [r#"SELECT "id", "name" FROM "active_user""#]);
    }

    #[test]
    fn field_exclusion_selects_the_rest() {
        let (database, driver) = database("sqlite://memory");
        database
            .session(|session| {
                session.find_where(
                    &EntitySql::<User>::create().fields(Fields::excluding(["email", "age"])),
                    Where::empty(),
                    None,
                )
            })
            .unwrap();
        assert_eq!(driver.journal().sql(), [r#"SELECT "id", "name" FROM "user""#]);
        let error = database
            .session(|session| {
                session.find_where(
                    &EntitySql::<User>::create()
                        .fields(Fields::excluding(["id", "name", "email", "age"])),
                    Where::empty(),
                    None,
                )
            })
            .unwrap_err();
        assert_eq!(ErrorKind::of(&error), ErrorKind::Mapping);
    }

    #[test]
    fn find_by_example_uses_set_properties() {
        let (database, driver) = database("sqlite://memory");
        let example = User {
            name: "a".into(),
            age: Some(20),
            ..Default::default()
        };
        database
            .session(|session| session.find_by_example(&example, None, None))
            .unwrap();
        let journal = driver.journal();
        assert_eq!(
            journal.sql(),
            [r#"SELECT "id", "name", "email", "age" FROM "user" WHERE "name" = ? AND "age" = ?"#]
        );
        assert_eq!(journal.statements[0].params[0], params!["a", 20]);
    }

    #[test]
    fn find_by_example_skips_default_values() {
        let (database, driver) = database("sqlite://memory");
        let example = User {
            email: Some("a@example.com".into()),
            ..Default::default()
        };
        database
            .session(|session| session.find_by_example(&example, None, None))
            .unwrap();
        let journal = driver.journal();
        assert_eq!(
            journal.sql(),
            [r#"SELECT "id", "name", "email", "age" FROM "user" WHERE "email" = ?"#]
        );
        assert_eq!(journal.statements[0].params[0], params!["a@example.com"]);
    }

    #[test]
    fn counts() {
        let (database, driver) = database("sqlite://memory");
        {
            let mut journal = driver.journal();
            journal.respond_count(5);
            journal.respond_count(2);
        }
        let (all, adults, none) = database
            .session(|session| {
                Ok((
                    session.count::<User>(&Where::empty())?,
                    session.count_sql(
                        &Sql::create("SELECT * FROM users WHERE age >= ?").param(18),
                    )?,
                    session.count::<User>(&Where::empty())?,
                ))
            })
            .unwrap();
        assert_eq!((all, adults, none), (5, 2, 0));
        assert_eq!(
            driver.journal().sql()[..2],
            [
                r#"SELECT count(*) FROM "user""#,
                "SELECT count(*) FROM (SELECT * FROM users WHERE age >= ?) c_t",
            ]
        );
    }

    #[test]
    fn raw_batch() {
        let (database, driver) = database("sqlite://memory");
        let batch = BatchSql::with_sql("UPDATE users SET age = ? WHERE id = ?")
            .add_params(params![20, 1])
            .add_params(params![21, 2])
            .add_statement("DELETE FROM users WHERE id = 3");
        let counts = database
            .session(|session| session.execute_batch(batch))
            .unwrap();
        assert_eq!(counts, [1, 1, 1]);
        let journal = driver.journal();
        assert_eq!(
            journal.sql(),
            [
                "UPDATE users SET age = ? WHERE id = ?",
                "DELETE FROM users WHERE id = 3",
            ]
        );
        assert_eq!(journal.statements[1].call, Call::Execute);
    }

    #[test]
    fn statements_are_deterministic() {
        let (database, driver) = database("sqlite://memory");
        let user = User {
            id: Some(1),
            ..User::named("a")
        };
        let session: Session = database.open_session().unwrap();
        session.update(&user, None).unwrap();
        session.update(&user, None).unwrap();
        session.execute_for_update(&Sql::create("DELETE FROM users")).unwrap();
        drop(session);
        let journal = driver.journal();
        assert_eq!(journal.statements[0].sql, journal.statements[1].sql);
        assert_eq!(journal.statements[0].params, journal.statements[1].params);
        assert_eq!(journal.closes, 1);
    }

    #[test]
    fn sharded_writes_address_their_table() {
        use crate::common::Order;
        use strata::ShardingList;
        let (database, driver) = database("sqlite://memory");
        let mut orders = ShardingList::new()
            .add(5, Order { id: 1, total: 10 })
            .add(6, Order { id: 2, total: 20 });
        database
            .session(|session| {
                session.insert_sharded(&mut orders, None)?;
                session.delete_sharded(&orders)?;
                session.count_sharded::<Order>(&Where::empty(), Some(&Value::Int32(Some(7))))
            })
            .unwrap();
        assert_eq!(
            driver.journal().sql(),
            [
                r#"INSERT INTO "orders_1" ("id", "total") VALUES (?, ?)"#,
                r#"INSERT INTO "orders_0" ("id", "total") VALUES (?, ?)"#,
                r#"DELETE FROM "orders_1" WHERE "id" = ?"#,
                r#"DELETE FROM "orders_0" WHERE "id" = ?"#,
                r#"SELECT count(*) FROM "orders_1""#,
            ]
        );
    }

    #[test]
    fn shardable_entities_address_their_table() {
        use crate::common::Order;
        use strata::ShardingList;
        let (database, driver) = database("sqlite://memory");
        let mut order = Order { id: 3, total: 10 };
        let example = Order { id: 4, total: 0 };
        database
            .session(|session| {
                session.insert_shardable(&mut order, None)?;
                session.update_shardable(&order, None)?;
                session.find_by_example_sharded(&example, None, None)?;
                session.delete_shardable(&order)?;
                session.delete_by_ids_sharded::<Order>(&ShardingList::new().add(2, 2).add(7, 7))
            })
            .unwrap();
        assert_eq!(
            driver.journal().sql(),
            [
                r#"INSERT INTO "orders_1" ("id", "total") VALUES (?, ?)"#,
                r#"UPDATE "orders_1" SET "total" = ? WHERE "id" = ?"#,
                r#"SELECT "id", "total" FROM "orders_0" WHERE "id" = ?"#,
                r#"DELETE FROM "orders_1" WHERE "id" = ?"#,
                r#"DELETE FROM "orders_0" WHERE "id" = ?"#,
                r#"DELETE FROM "orders_1" WHERE "id" = ?"#,
            ]
        );
    }

    #[test]
    fn ddl() {
        let (database, driver) = database("sqlite://memory");
        database
            .session(|session| {
                session.drop_table::<Member>(None)?;
                session.create_table::<Member>(None)
            })
            .unwrap();
        let journal = driver.journal();
        assert_eq!(journal.statements[0].sql, r#"DROP TABLE IF EXISTS "member""#);
        assert_eq!(
            journal.statements[1].sql,
            indoc::indoc! {r#"
                CREATE TABLE IF NOT EXISTS "member" (
                    "group_id" INTEGER NOT NULL,
                    "user_id" INTEGER NOT NULL,
                    "role" TEXT DEFAULT 'guest',
                    PRIMARY KEY ("group_id", "user_id")
                )"#}
        );
    }
}
