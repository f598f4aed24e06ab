//! In-memory store for exercising the handler without a database

use std::sync::{
    atomic::{AtomicI64, Ordering},
    Mutex,
};

use async_trait::async_trait;
use diesel::QueryResult;

use crate::{
    keys::{GeneratedKeyHolder, KeyRow},
    named_sql::parse_sql_statement,
    operations::NamedParameterOperations,
    parameter_source::ParameterSource,
    utils::D1Error,
    value::BindValue,
};

/// A statement the store executed, with its resolved binds
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Executed {
    pub sql: String,
    pub binds: Vec<BindValue>,
}

/// Behaves like a table with an auto-increment key
#[derive(Debug)]
pub(crate) struct MemoryOperations {
    next_id: AtomicI64,
    affected_rows: usize,
    generates_keys: bool,
    failure: Option<String>,
    executed: Mutex<Vec<Executed>>,
}

impl MemoryOperations {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            affected_rows: 1,
            generates_keys: true,
            failure: None,
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_affected_rows(mut self, rows: usize) -> Self {
        self.affected_rows = rows;
        self
    }

    pub fn without_generated_keys(mut self) -> Self {
        self.generates_keys = false;
        self
    }

    pub fn failing_with(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn executed(&self) -> Vec<Executed> {
        self.executed.lock().unwrap().clone()
    }

    fn run(&self, sql: &str, params: &dyn ParameterSource) -> QueryResult<usize> {
        let parsed = parse_sql_statement(sql)?;
        let binds = parsed.bind(params)?;
        if let Some(message) = &self.failure {
            return Err(D1Error::new(message.clone()).into_diesel());
        }
        self.executed.lock().unwrap().push(Executed {
            sql: parsed.sql().to_string(),
            binds,
        });
        Ok(self.affected_rows)
    }
}

#[async_trait]
impl NamedParameterOperations for MemoryOperations {
    async fn update(&self, sql: &str, params: &dyn ParameterSource) -> QueryResult<usize> {
        self.run(sql, params)
    }

    async fn update_with_keys(
        &self,
        sql: &str,
        params: &dyn ParameterSource,
        key_holder: &mut GeneratedKeyHolder,
    ) -> QueryResult<usize> {
        let affected = self.run(sql, params)?;
        if self.generates_keys {
            for _ in 0..affected {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                let column = key_holder.primary_key_column().to_string();
                key_holder.push(KeyRow::new().with(column, id));
            }
        }
        Ok(affected)
    }
}
