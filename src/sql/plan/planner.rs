use crate::{
    error::{Error, Result},
    sql::{
        parser::ast,
        plan::{Node, Plan},
        schema::{Constraints, Schema},
    },
};

/// Query planner - converts AST into execution plan nodes
pub struct Planner;

impl Planner {
    pub fn new() -> Self {
        Self {}
    }

    /// Builds an execution plan from an AST statement
    pub fn build(&mut self, stmt: ast::Statement) -> Result<Plan> {
        Ok(Plan(self.build_statement(stmt)?))
    }

    pub fn build_statement(&self, stmt: ast::Statement) -> Result<Node> {
        Ok(match stmt {
            ast::Statement::CreateTable { name, columns } => {
                let mut schema = Schema::new(name)?;
                for c in columns {
                    let constraints = Constraints {
                        primary_key: c.primary_key,
                        unique: c.unique,
                        not_null: c.not_null,
                    };
                    schema.define_column(c.name, c.datatype, constraints)?;
                }
                schema.validate()?;
                Node::CreateTable { schema }
            }
            ast::Statement::Drop { table_name } => Node::DropTable { table_name },
            ast::Statement::Insert { table_name, columns, values } => Node::Insert {
                table_name,
                columns,
                values,
            },
            ast::Statement::Select(select) => self.build_select(select)?,
            ast::Statement::Update {
                table_name,
                assignments,
                where_clause,
            } => Node::Update {
                table_name,
                assignments,
                filter: where_clause,
            },
            ast::Statement::Delete {
                table_name,
                where_clause,
            } => Node::Delete {
                table_name,
                filter: where_clause,
            },
            ast::Statement::DescribeSchema { table_name } => Node::DescribeSchema { table_name },
            ast::Statement::ListTables => Node::ListTables,
            ast::Statement::Explain(select) => Node::Explain(Box::new(self.build_select(select)?)),
        })
    }

    /// Scan or join, wrapped in a projection
    fn build_select(&self, select: ast::Select) -> Result<Node> {
        let source = match select.join {
            None => Node::Scan {
                table_name: select.from,
                filter: select.where_clause,
            },
            Some(join) => {
                if join.table == select.from {
                    return Err(Error::UnsupportedSyntax(format!(
                        "self join on table {}",
                        join.table
                    )));
                }
                // Both sides of ON must name a joined table, one each
                let tables = [select.from.as_str(), join.table.as_str()];
                for side in [&join.left, &join.right] {
                    match side.table.as_deref() {
                        Some(table) if tables.contains(&table) => {}
                        _ => {
                            return Err(Error::Syntax(format!(
                                "join condition must reference {} or {}, got {}",
                                select.from, join.table, side
                            )));
                        }
                    }
                }
                if join.left.table == join.right.table {
                    return Err(Error::Syntax(format!(
                        "join condition {} = {} must compare the two tables",
                        join.left, join.right
                    )));
                }

                Node::NestedLoopJoin {
                    left: Box::new(Node::Scan {
                        table_name: select.from,
                        filter: Vec::new(),
                    }),
                    right: Box::new(Node::Scan {
                        table_name: join.table,
                        filter: Vec::new(),
                    }),
                    on: (join.left, join.right),
                    filter: select.where_clause,
                }
            }
        };

        Ok(Node::Projection {
            source: Box::new(source),
            columns: select.projection,
        })
    }
}
