use crate::{
    error::Result,
    sql::{executor::{Executor, ResultSet}, schema::Schema},
    storage::Database,
};

/// CREATE TABLE executor
pub struct CreateTable {
    schema: Schema,
}

impl CreateTable {
    pub fn new(schema: Schema) -> Box<Self> {
        Box::new(Self { schema })
    }
}

impl Executor for CreateTable {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        let table_name = self.schema.name.clone();
        db.create_table(self.schema)?;
        Ok(ResultSet::CreateTable { table_name })
    }
}

/// DROP TABLE executor
pub struct DropTable {
    table_name: String,
}

impl DropTable {
    pub fn new(table_name: String) -> Box<Self> {
        Box::new(Self { table_name })
    }
}

impl Executor for DropTable {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        db.drop_table(&self.table_name)?;
        Ok(ResultSet::DropTable { table_name: self.table_name })
    }
}

/// SCHEMA / DESCRIBE executor
pub struct DescribeSchema {
    table_name: String,
}

impl DescribeSchema {
    pub fn new(table_name: String) -> Box<Self> {
        Box::new(Self { table_name })
    }
}

impl Executor for DescribeSchema {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        let columns = db.must_get_table(&self.table_name)?.schema().columns().to_vec();
        Ok(ResultSet::Schema { table_name: self.table_name, columns })
    }
}

/// TABLES executor
pub struct ListTables;

impl ListTables {
    pub fn new() -> Box<Self> {
        Box::new(Self {})
    }
}

impl Executor for ListTables {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        Ok(ResultSet::Tables { names: db.table_names() })
    }
}
