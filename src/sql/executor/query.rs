use std::collections::HashMap;

use crate::{
    error::{Error, Result},
    sql::{
        executor::{Executor, ResultSet, bind_filter, describe_filter, label, resolve_column, split_label},
        parser::ast::{ColumnRef, Condition},
        plan::Node,
    },
    storage::{Database, table::AccessPath},
};

/// Table scan executor (SELECT)
pub struct Scan {
    table_name: String,
    filter: Vec<Condition>,
}

impl Scan {
    pub fn new(table_name: String, filter: Vec<Condition>) -> Box<Self> {
        Box::new(Self { table_name, filter })
    }
}

impl Executor for Scan {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        let schema = db.must_get_table(&self.table_name)?.schema();
        let columns = schema.columns().iter().map(|c| label(&schema.name, &c.name)).collect();
        let predicate = bind_filter(schema, &self.filter)?;

        let mut scan = db.select(&self.table_name, &predicate)?;
        let rows = scan.by_ref().map(|(_, row)| row.clone()).collect();
        let index_used = match scan.access_path() {
            AccessPath::IndexLookup { column, .. } => Some(column.clone()),
            AccessPath::FullScan => None,
        };
        Ok(ResultSet::Scan {
            columns,
            rows,
            stats: scan.stats(),
            index_used,
        })
    }
}

/// Projection executor - picks and labels the output columns
///
/// `SELECT *` keeps every column, labelled bare for a single table and
/// qualified for a join. Named columns are labelled bare unless two of them
/// share a name.
pub struct Projection {
    source: Box<dyn Executor>,
    columns: Vec<ColumnRef>,
}

impl Projection {
    pub fn new(source: Box<dyn Executor>, columns: Vec<ColumnRef>) -> Box<Self> {
        Box::new(Self { source, columns })
    }
}

impl Executor for Projection {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        match self.source.execute(db)? {
            ResultSet::Scan {
                columns,
                rows,
                stats,
                index_used,
            } => {
                let (labels, positions): (Vec<String>, Vec<usize>) = if self.columns.is_empty() {
                    let first_table = columns.first().map(|c| split_label(c).0);
                    let single = columns.iter().all(|c| Some(split_label(c).0) == first_table);
                    let labels = columns
                        .iter()
                        .map(|c| if single { split_label(c).1.to_string() } else { c.clone() })
                        .collect();
                    (labels, (0..columns.len()).collect())
                } else {
                    let positions = self
                        .columns
                        .iter()
                        .map(|c| resolve_column(&columns, c))
                        .collect::<Result<Vec<_>>>()?;
                    for (i, pos) in positions.iter().enumerate() {
                        if positions[..i].contains(pos) {
                            return Err(Error::Schema(format!(
                                "column {} selected more than once",
                                columns[*pos]
                            )));
                        }
                    }
                    let mut seen: HashMap<&str, usize> = HashMap::new();
                    for pos in &positions {
                        *seen.entry(split_label(&columns[*pos]).1).or_default() += 1;
                    }
                    let labels = positions
                        .iter()
                        .map(|pos| {
                            let bare = split_label(&columns[*pos]).1;
                            if seen[bare] > 1 { columns[*pos].clone() } else { bare.to_string() }
                        })
                        .collect();
                    (labels, positions)
                };

                let rows = rows
                    .into_iter()
                    .map(|row| positions.iter().map(|pos| row[*pos].clone()).collect())
                    .collect();
                Ok(ResultSet::Scan {
                    columns: labels,
                    rows,
                    stats,
                    index_used,
                })
            }
            _ => Err(Error::Internal("Unexpected result set".into())),
        }
    }
}

/// EXPLAIN executor - renders the plan and the access path of each scan
/// without reading any rows
pub struct Explain {
    node: Node,
}

impl Explain {
    pub fn new(node: Node) -> Box<Self> {
        Box::new(Self { node })
    }
}

impl Executor for Explain {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        let mut lines = Vec::new();
        explain_node(&self.node, db, 0, &mut lines)?;
        Ok(ResultSet::Explain { lines })
    }
}

fn explain_node(node: &Node, db: &Database, depth: usize, lines: &mut Vec<String>) -> Result<()> {
    let indent = "  ".repeat(depth);
    match node {
        Node::Projection { source, columns } => {
            let columns = if columns.is_empty() {
                "*".to_string()
            } else {
                columns.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
            };
            lines.push(format!("{}Projection: {}", indent, columns));
            explain_node(source, db, depth + 1, lines)
        }
        Node::Scan { table_name, filter } => {
            let table = db.must_get_table(table_name)?;
            let path = table.access_path(&bind_filter(table.schema(), filter)?);
            lines.push(format!("{}Scan {}: {}{}", indent, table_name, path, where_suffix(filter)));
            Ok(())
        }
        Node::NestedLoopJoin { left, right, on, filter } => {
            lines.push(format!(
                "{}Nested loop join on {} = {}{}",
                indent,
                on.0,
                on.1,
                where_suffix(filter)
            ));
            explain_node(left, db, depth + 1, lines)?;
            explain_node(right, db, depth + 1, lines)
        }
        _ => Err(Error::Internal("only queries can be explained".into())),
    }
}

fn where_suffix(filter: &[Condition]) -> String {
    if filter.is_empty() {
        String::new()
    } else {
        format!(" where {}", describe_filter(filter))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::{
        error::{Error, Result},
        sql::{
            executor::{
                ResultSet,
                tests::{execute, setup},
            },
            types::Value,
        },
        storage::{Database, table::ScanStats},
    };

    const SETUP: &[&str] = &[
        "create table users (id int primary key, name text, email text unique, age int)",
        "insert into users values (1, 'ann', 'a@x', 30)",
        "insert into users values (2, 'bob', null, 40)",
        "insert into users values (3, 'cy', 'c@x', 50)",
    ];

    #[test]
    fn test_scan_paths_and_stats() -> Result<()> {
        let dir = TempDir::new()?;
        let mut db = setup(&dir, SETUP)?;

        let ResultSet::Scan { columns, rows, stats, index_used } =
            execute(&mut db, "select * from users where id = 2")?
        else {
            panic!("expected scan");
        };
        assert_eq!(columns, vec!["id", "name", "email", "age"]);
        assert_eq!(rows, vec![vec![Value::Integer(2), Value::Text("bob".into()), Value::Null, Value::Integer(40)]]);
        assert_eq!(stats, ScanStats { scanned: 1, returned: 1 });
        assert_eq!(index_used.as_deref(), Some("id"));

        // The index narrows the candidates; remaining terms still filter
        let ResultSet::Scan { rows, index_used, .. } =
            execute(&mut db, "select name from users where age > 40 and email = 'a@x'")?
        else {
            panic!("expected scan");
        };
        assert!(rows.is_empty());
        assert_eq!(index_used.as_deref(), Some("email"));

        let ResultSet::Scan { columns, rows, stats, index_used } =
            execute(&mut db, "select name, users.age from users where age >= 40")?
        else {
            panic!("expected scan");
        };
        assert_eq!(columns, vec!["name", "age"]);
        assert_eq!(
            rows,
            vec![
                vec![Value::Text("bob".into()), Value::Integer(40)],
                vec![Value::Text("cy".into()), Value::Integer(50)],
            ]
        );
        assert_eq!(stats, ScanStats { scanned: 3, returned: 2 });
        assert_eq!(index_used, None);
        Ok(())
    }

    #[test]
    fn test_null_comparisons() -> Result<()> {
        let dir = TempDir::new()?;
        let mut db = setup(&dir, SETUP)?;
        fn count(db: &mut Database, sql: &str) -> Result<usize> {
            match execute(db, sql)? {
                ResultSet::Scan { rows, .. } => Ok(rows.len()),
                other => panic!("expected scan, got {:?}", other),
            }
        }
        assert_eq!(count(&mut db, "select * from users where email = null")?, 1);
        assert_eq!(count(&mut db, "select * from users where email != null")?, 2);
        assert_eq!(count(&mut db, "select * from users where email > 'a'")?, 2);
        Ok(())
    }

    #[test]
    fn test_projection_errors() -> Result<()> {
        let dir = TempDir::new()?;
        let mut db = setup(&dir, SETUP)?;
        assert!(matches!(execute(&mut db, "select nope from users"), Err(Error::NotFound(_))));
        assert!(matches!(execute(&mut db, "select * from ghosts"), Err(Error::NotFound(_))));

        // Each projected column needs its own label
        for sql in ["select id, id from users", "select id, users.id from users"] {
            assert_eq!(
                execute(&mut db, sql),
                Err(Error::Schema("column users.id selected more than once".into()))
            );
        }
        Ok(())
    }

    #[test]
    fn test_explain() -> Result<()> {
        let dir = TempDir::new()?;
        let mut db = setup(
            &dir,
            &[SETUP[0], "create table orders (uid int, total int)"],
        )?;

        assert_eq!(
            execute(&mut db, "explain select name from users where id = 1")?,
            ResultSet::Explain {
                lines: vec![
                    "Projection: name".into(),
                    "  Scan users: index lookup on id = 1 where id = 1".into(),
                ]
            }
        );
        assert_eq!(
            execute(&mut db, "explain select * from users where age < 3")?,
            ResultSet::Explain {
                lines: vec!["Projection: *".into(), "  Scan users: full scan where age < 3".into()]
            }
        );
        assert_eq!(
            execute(
                &mut db,
                "explain select users.name, orders.total from users join orders on users.id = orders.uid where total > 10"
            )?,
            ResultSet::Explain {
                lines: vec![
                    "Projection: users.name, orders.total".into(),
                    "  Nested loop join on users.id = orders.uid where total > 10".into(),
                    "    Scan users: full scan".into(),
                    "    Scan orders: full scan".into(),
                ]
            }
        );
        assert!(matches!(
            execute(&mut db, "explain select * from ghosts"),
            Err(Error::NotFound(_))
        ));
        Ok(())
    }
}
