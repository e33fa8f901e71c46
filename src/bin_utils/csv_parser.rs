use std::{io::Read, marker::PhantomData};

use csv::{DeserializeRecordsIntoIter, Trim};
use rust_decimal::Decimal;
use serde::{Deserialize, de::DeserializeOwned};

use crate::account::AccountNumber;

/// Existing account loaded before any request is applied.
#[derive(Debug, Deserialize)]
pub struct AccountRow {
    pub number: AccountNumber,
    pub client: String,
    pub balance: Decimal,
    pub active: bool,
}

/// Request row. `type` stays a string so unknown types are reported per row.
#[derive(Debug, Deserialize)]
pub struct RequestRow {
    #[serde(rename = "type")]
    pub kind: String,
    pub origin: AccountNumber,
    pub destination: Option<AccountNumber>,
    pub amount: Decimal,
    pub description: Option<String>,
}

/// Reads CSV rows, yielding each with the line it started on.
pub struct CsvParser<R, T> {
    iter: DeserializeRecordsIntoIter<R, T>,
    _row: PhantomData<T>,
}

impl<R, T> CsvParser<R, T>
where
    R: Read,
    T: DeserializeOwned,
{
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);

        Self {
            iter: reader.into_deserialize(),
            _row: PhantomData,
        }
    }
}

impl<R, T> Iterator for CsvParser<R, T>
where
    R: Read,
    T: DeserializeOwned,
{
    type Item = (u64, Result<T, csv::Error>);

    fn next(&mut self) -> Option<Self::Item> {
        // position before reading is where the upcoming record starts
        let line = self.iter.reader().position().line();
        let row = self.iter.next()?;
        Some((line, row))
    }
}
