//! Facet queries
//!
//! Grouped frequency lists and per-dimension option lists driven by a
//! [`SelectionVector`]. `Concrete` facets filter, `Aggregate` facets drop
//! out of the GROUP BY, `Any` facets do neither.

use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::debug;

use super::error::{Result, StoreError};
use super::models::{FieldValue, FrequencyCursor, FrequencyPage, FrequencyRow};
use super::predicate::Filter;
use super::schema::Dimension;
use super::selection::SelectionVector;
use super::Corpus;

/// Extension trait for facet query operations
pub trait FacetOps {
    fn select_frequencies(&self, selection: &SelectionVector, page_size: u32, after: Option<&FrequencyCursor>) -> impl std::future::Future<Output = Result<FrequencyPage>> + Send;
    fn select_options(&self, selection: &SelectionVector, dimension: usize) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
    fn select_all_options(&self, selection: &SelectionVector) -> impl std::future::Future<Output = Result<Vec<Vec<String>>>> + Send;
}

impl FacetOps for Corpus {
    /// Grouped frequencies, highest first, ties broken by the grouped values
    /// in ascending order. `after` resumes strictly behind a row returned by
    /// an earlier page of the same selection.
    async fn select_frequencies(
        &self,
        selection: &SelectionVector,
        page_size: u32,
        after: Option<&FrequencyCursor>,
    ) -> Result<FrequencyPage> {
        if page_size == 0 {
            return Err(StoreError::InvalidPageSize);
        }
        let filter = Filter::from_selection(self.schema(), selection)?;
        let grouped: Vec<Dimension> = selection
            .grouped_dimensions()
            .into_iter()
            .map(|i| self.schema().dimension(i))
            .collect::<Result<_>>()?;
        if let Some(cursor) = after {
            if cursor.values.len() != grouped.len() {
                return Err(StoreError::InvalidCursor {
                    expected: grouped.len(),
                    got: cursor.values.len(),
                });
            }
        }

        let (total, distinct) = self.totals(&filter).await?;

        // Without grouping the only row is the grand total
        if grouped.is_empty() {
            let rows = if distinct > 0 && after.is_none() {
                vec![FrequencyRow {
                    frequency: total,
                    fields: vec![FieldValue::Aggregated; selection.len()],
                }]
            } else {
                Vec::new()
            };
            return Ok(FrequencyPage { total, distinct, rows, next: None });
        }

        let columns = grouped.iter().map(|d| d.column()).collect::<Vec<_>>().join(", ");
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT SUM(freq) AS total, {columns} FROM {}",
            self.schema().freqs_table()
        ));
        filter.push_where(&mut qb);
        qb.push(format!(" GROUP BY {columns}"));
        if let Some(cursor) = after {
            qb.push(" HAVING SUM(freq) < ");
            qb.push_bind(cursor.frequency);
            qb.push(" OR (SUM(freq) = ");
            qb.push_bind(cursor.frequency);
            qb.push(format!(" AND ({columns}) > ("));
            {
                let mut separated = qb.separated(", ");
                for value in &cursor.values {
                    separated.push_bind(value.clone());
                }
            }
            qb.push("))");
        }
        qb.push(format!(" ORDER BY total DESC, {columns} LIMIT "));
        qb.push_bind(i64::from(page_size) + 1);

        debug!(corpus = self.name(), sql = qb.sql(), "Selecting frequencies");
        let records = qb.build().fetch_all(self.pool()).await?;

        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            let mut values = Vec::with_capacity(grouped.len());
            for i in 0..grouped.len() {
                values.push(record.try_get::<String, _>(i + 1)?);
            }
            let mut values = values.into_iter();
            let fields = selection
                .iter()
                .map(|facet| {
                    // Only grouped dimensions have a selected column
                    if facet.is_grouped() {
                        values.next().map_or(FieldValue::Aggregated, FieldValue::Value)
                    } else {
                        FieldValue::Aggregated
                    }
                })
                .collect();
            rows.push(FrequencyRow {
                frequency: record.try_get::<i64, _>(0)?,
                fields,
            });
        }

        let next = if rows.len() > page_size as usize {
            rows.truncate(page_size as usize);
            rows.last().map(FrequencyCursor::from)
        } else {
            None
        };

        Ok(FrequencyPage { total, distinct, rows, next })
    }

    /// Distinct values of `dimension` among rows matching every filter
    /// except the one on `dimension` itself, sorted ascending.
    async fn select_options(&self, selection: &SelectionVector, dimension: usize) -> Result<Vec<String>> {
        let dimension = self.schema().dimension(dimension)?;
        let filter = Filter::from_selection(self.schema(), selection)?.without(dimension);
        let column = dimension.column();

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT DISTINCT {column} FROM {}",
            self.schema().freqs_table()
        ));
        filter.push_where(&mut qb);
        qb.push(format!(" ORDER BY {column}"));

        debug!(corpus = self.name(), sql = qb.sql(), "Selecting options");
        let options = qb.build_query_scalar::<String>().fetch_all(self.pool()).await?;
        Ok(options)
    }

    /// Option lists for every dimension, in dimension order.
    async fn select_all_options(&self, selection: &SelectionVector) -> Result<Vec<Vec<String>>> {
        self.schema().check_selection(selection)?;
        let mut all = Vec::with_capacity(selection.len());
        for dimension in 0..selection.len() {
            all.push(self.select_options(selection, dimension).await?);
        }
        Ok(all)
    }
}

impl Corpus {
    /// Sum of counters and number of rows matching `filter`.
    async fn totals(&self, filter: &Filter) -> Result<(i64, i64)> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT COALESCE(SUM(freq), 0) AS total, COUNT(*) AS distinct_keys FROM {}",
            self.schema().freqs_table()
        ));
        filter.push_where(&mut qb);
        let row = qb.build().fetch_one(self.pool()).await?;
        Ok((row.try_get("total")?, row.try_get("distinct_keys")?))
    }
}
