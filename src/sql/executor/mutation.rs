use crate::{
    error::{Error, Result},
    sql::{
        executor::{Executor, ResultSet, bind_filter},
        parser::ast::{Condition, Literal},
        schema::Schema,
        types::{Row, Value},
    },
    storage::Database,
};

/// INSERT executor
pub struct Insert {
    table_name: String,
    columns: Option<Vec<String>>,
    values: Vec<Literal>,
}

impl Insert {
    pub fn new(table_name: String, columns: Option<Vec<String>>, values: Vec<Literal>) -> Box<Self> {
        Box::new(Self {
            table_name,
            columns,
            values,
        })
    }
}

// Lays out the supplied values in schema order
// insert into tbl (d, b) values (1, 2);
//    a       b       c       d
//   NULL     2      NULL     1
fn make_row(schema: &Schema, columns: Option<&[String]>, values: &[Literal]) -> Result<Row> {
    let positions: Vec<usize> = match columns {
        None => {
            if values.len() != schema.columns().len() {
                return Err(Error::Schema(format!(
                    "table {} expects {} values, got {}",
                    schema.name,
                    schema.columns().len(),
                    values.len()
                )));
            }
            (0..values.len()).collect()
        }
        Some(columns) => {
            if columns.len() != values.len() {
                return Err(Error::Schema(format!(
                    "{} columns but {} values",
                    columns.len(),
                    values.len()
                )));
            }
            let mut positions = Vec::with_capacity(columns.len());
            for name in columns {
                let pos = schema.must_position(name)?;
                if positions.contains(&pos) {
                    return Err(Error::Schema(format!("column {} listed more than once", name)));
                }
                positions.push(pos);
            }
            positions
        }
    };

    // Omitted columns stay NULL; the table rejects them if NOT NULL
    let mut row = vec![Value::Null; schema.columns().len()];
    for (pos, literal) in positions.into_iter().zip(values) {
        row[pos] = schema.column(pos).validate_value(literal)?;
    }
    Ok(row)
}

impl Executor for Insert {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        let schema = db.must_get_table(&self.table_name)?.schema();
        let row = make_row(schema, self.columns.as_deref(), &self.values)?;
        db.insert(&self.table_name, row)?;
        Ok(ResultSet::Insert { count: 1 })
    }
}

/// UPDATE executor
pub struct Update {
    table_name: String,
    assignments: Vec<(String, Literal)>,
    filter: Vec<Condition>,
}

impl Update {
    pub fn new(table_name: String, assignments: Vec<(String, Literal)>, filter: Vec<Condition>) -> Box<Self> {
        Box::new(Self {
            table_name,
            assignments,
            filter,
        })
    }
}

impl Executor for Update {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        let schema = db.must_get_table(&self.table_name)?.schema();
        let predicate = bind_filter(schema, &self.filter)?;

        let mut assignments: Vec<(usize, Value)> = Vec::with_capacity(self.assignments.len());
        for (name, literal) in &self.assignments {
            let pos = schema.must_position(name)?;
            if assignments.iter().any(|(p, _)| *p == pos) {
                return Err(Error::Schema(format!("column {} assigned more than once", name)));
            }
            assignments.push((pos, schema.column(pos).validate_value(literal)?));
        }

        let count = db.update(&self.table_name, &predicate, &assignments)?;
        Ok(ResultSet::Update { count })
    }
}

/// DELETE executor
pub struct Delete {
    table_name: String,
    filter: Vec<Condition>,
}

impl Delete {
    pub fn new(table_name: String, filter: Vec<Condition>) -> Box<Self> {
        Box::new(Self { table_name, filter })
    }
}

impl Executor for Delete {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        let predicate = bind_filter(db.must_get_table(&self.table_name)?.schema(), &self.filter)?;
        let count = db.delete(&self.table_name, &predicate)?;
        Ok(ResultSet::Delete { count })
    }
}
