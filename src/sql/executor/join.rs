use crate::{
    error::{Error, Result},
    sql::{
        executor::{Executor, ResultSet, bind_joined_filter, resolve_column},
        parser::ast::{ColumnRef, Condition},
    },
    storage::{Database, table::ScanStats},
};

/// Nested Loop Join executor - inner equi-join of two inputs
///
/// Every left row (outer) is tested against every right row (inner); a
/// matching pair becomes one concatenated row. The WHERE terms run against
/// the joined rows.
pub struct NestedLoopJoin {
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    on: (ColumnRef, ColumnRef),
    filter: Vec<Condition>,
}

impl NestedLoopJoin {
    pub fn new(
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
        on: (ColumnRef, ColumnRef),
        filter: Vec<Condition>,
    ) -> Box<Self> {
        Box::new(Self {
            left,
            right,
            on,
            filter,
        })
    }
}

impl Executor for NestedLoopJoin {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        // Execute left side first
        let ResultSet::Scan {
            columns: lcols,
            rows: lrows,
            stats: lstats,
            ..
        } = self.left.execute(db)?
        else {
            return Err(Error::Internal("Unexpected result set".into()));
        };
        let ResultSet::Scan {
            columns: rcols,
            rows: rrows,
            stats: rstats,
            ..
        } = self.right.execute(db)?
        else {
            return Err(Error::Internal("Unexpected result set".into()));
        };

        // ON may name the tables in either order
        let (lpos, rpos) = match (resolve_column(&lcols, &self.on.0), resolve_column(&rcols, &self.on.1)) {
            (Ok(l), Ok(r)) => (l, r),
            _ => (resolve_column(&lcols, &self.on.1)?, resolve_column(&rcols, &self.on.0)?),
        };

        let mut columns = lcols;
        columns.extend(rcols);
        let predicate = bind_joined_filter(db, &columns, &self.filter)?;

        let mut rows = Vec::new();
        for lrow in &lrows {
            let key = &lrow[lpos];
            // NULL never joins
            if key.is_null() {
                continue;
            }
            for rrow in &rrows {
                if rrow[rpos] != *key {
                    continue;
                }
                let mut row = lrow.clone();
                row.extend(rrow.iter().cloned());
                if predicate.matches(&row) {
                    rows.push(row);
                }
            }
        }

        let stats = ScanStats {
            scanned: lstats.scanned + rstats.scanned,
            returned: rows.len(),
        };
        Ok(ResultSet::Scan {
            columns,
            rows,
            stats,
            index_used: None,
        })
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
        storage::table::ScanStats,
    };

    const SETUP: &[&str] = &[
        "create table a (id int primary key, name text)",
        "create table b (aid int, val text)",
        "insert into a values (1, 'a')",
        "insert into a values (2, 'b')",
        "insert into b values (1, 'x')",
        "insert into b values (3, 'y')",
    ];

    #[test]
    fn test_join_pairs_matching_rows() -> Result<()> {
        let dir = TempDir::new()?;
        let mut db = setup(&dir, SETUP)?;

        let ResultSet::Scan { columns, rows, stats, index_used } =
            execute(&mut db, "SELECT A.name, B.val FROM A JOIN B ON A.id = B.aid")?
        else {
            panic!("expected scan");
        };
        assert_eq!(columns, vec!["name", "val"]);
        assert_eq!(rows, vec![vec![Value::Text("a".into()), Value::Text("x".into())]]);
        assert_eq!(stats, ScanStats { scanned: 4, returned: 1 });
        assert_eq!(index_used, None);

        // Reversed ON and INNER JOIN give the same rows
        let ResultSet::Scan { rows: reversed, .. } =
            execute(&mut db, "select a.name, b.val from a inner join b on b.aid = a.id")?
        else {
            panic!("expected scan");
        };
        assert_eq!(reversed, rows);
        Ok(())
    }

    #[test]
    fn test_join_star_and_where() -> Result<()> {
        let dir = TempDir::new()?;
        let mut db = setup(&dir, SETUP)?;
        execute(&mut db, "insert into b values (1, 'z')")?;
        execute(&mut db, "insert into b values (null, 'n')")?;

        let ResultSet::Scan { columns, rows, .. } = execute(&mut db, "select * from a join b on a.id = b.aid")?
        else {
            panic!("expected scan");
        };
        assert_eq!(columns, vec!["a.id", "a.name", "b.aid", "b.val"]);
        assert_eq!(rows.len(), 2);

        let ResultSet::Scan { rows, .. } =
            execute(&mut db, "select val from a join b on a.id = b.aid where val != 'x' and a.id = '1'")?
        else {
            panic!("expected scan");
        };
        assert_eq!(rows, vec![vec![Value::Text("z".into())]]);

        assert!(matches!(
            execute(&mut db, "select id from a join b on a.id = b.aid"),
            Ok(ResultSet::Scan { .. })
        ));
        assert!(matches!(
            execute(&mut db, "select * from a join b on a.id = b.aid where missing = 1"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            execute(&mut db, "select * from a join b on a.nope = b.aid"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            execute(&mut db, "select * from a join ghosts on a.id = ghosts.aid"),
            Err(Error::NotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_ambiguous_bare_column() -> Result<()> {
        let dir = TempDir::new()?;
        let mut db = setup(
            &dir,
            &["create table p (id int, tag text)", "create table q (id int, tag text)"],
        )?;
        assert!(matches!(
            execute(&mut db, "select tag from p join q on p.id = q.id"),
            Err(Error::Schema(_))
        ));
        let ResultSet::Scan { columns, .. } =
            execute(&mut db, "select p.tag, q.tag from p join q on p.id = q.id")?
        else {
            panic!("expected scan");
        };
        assert_eq!(columns, vec!["p.tag", "q.tag"]);
        Ok(())
    }
}
