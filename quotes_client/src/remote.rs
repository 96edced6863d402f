//! `QuoteProvider` served by a remote quotes server.
use std::sync::Mutex;

use quotes_common::command::SearchQuery;
use quotes_common::{Quote, QuoteId, QuoteProvider, Request, Response, Result};

use crate::connection::{Connection, unexpected};

/// Performs every retrieval operation as a request on one shared connection.
pub struct RemoteProvider {
    connection: Mutex<Connection>,
}

impl RemoteProvider {
    pub fn connect(server_addr: &str) -> Result<Self> {
        Ok(Self {
            connection: Mutex::new(Connection::open(server_addr)?),
        })
    }

    fn call(&self, request: Request) -> Result<Response> {
        let mut connection = self.connection.lock()?;
        connection.call(&request)
    }

    fn call_for_quotes(&self, request: Request) -> Result<Vec<Quote>> {
        match self.call(request)? {
            Response::Quotes { quotes } => Ok(quotes),
            other => Err(unexpected(other)),
        }
    }
}

impl QuoteProvider for RemoteProvider {
    fn all_quotes(&self) -> Result<Vec<Quote>> {
        self.call_for_quotes(Request::GetAllQuotes)
    }

    fn number_of_quotes(&self) -> Result<usize> {
        match self.call(Request::GetNumberOfQuotes)? {
            Response::NumberOfQuotes { count } => Ok(count),
            other => Err(unexpected(other)),
        }
    }

    fn quotes(&self, ids: &[QuoteId]) -> Result<Vec<Quote>> {
        self.call_for_quotes(Request::GetQuotes { ids: ids.to_vec() })
    }

    fn random_quote(&self) -> Result<Quote> {
        match self.call(Request::GetQuoteUnsubscribed)? {
            Response::Quote { quote } => Ok(quote),
            other => Err(unexpected(other)),
        }
    }

    fn search(&self, query: &str) -> Result<Vec<Quote>> {
        self.call_for_quotes(Request::Search {
            query: SearchQuery::One(query.to_string()),
        })
    }

    fn search_all(&self, queries: &[String]) -> Result<Vec<Quote>> {
        self.call_for_quotes(Request::Search {
            query: SearchQuery::Many(queries.to_vec()),
        })
    }
}
