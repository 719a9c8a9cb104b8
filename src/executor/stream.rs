use futures::Stream;
use uuid::Uuid;

use crate::core::{RepoError, Result, Row};
use crate::driver::{DriverConnection, RowCursor};

/// Lazy, pull-driven sequence of result rows.
///
/// Nothing is buffered: each call to [`try_next`](Self::try_next) pulls
/// one row from the driver cursor, preserving the transport's
/// backpressure. The stream owns its connection and cursor exclusively
/// and releases the cursor exactly once: on exhaustion, on error, or on
/// drop when the consumer abandons the sequence early.
pub struct RowStream {
    // Kept alive for as long as the cursor may still be pulled.
    _connection: Box<dyn DriverConnection>,
    cursor: Box<dyn RowCursor>,
    query: String,
    invocation: Uuid,
    done: bool,
}

impl RowStream {
    pub(crate) fn new(
        connection: Box<dyn DriverConnection>,
        cursor: Box<dyn RowCursor>,
        query: impl Into<String>,
        invocation: Uuid,
    ) -> Self {
        Self {
            _connection: connection,
            cursor,
            query: query.into(),
            invocation,
            done: false,
        }
    }

    /// Pulls the next row. Returns `Ok(None)` once the sequence is
    /// exhausted; after an error the stream stays terminated.
    pub async fn try_next(&mut self) -> Result<Option<Row>> {
        if self.done {
            return Ok(None);
        }
        match self.cursor.try_next().await {
            Ok(Some(row)) => Ok(Some(row)),
            Ok(None) => {
                self.finish();
                Ok(None)
            }
            Err(source) => {
                self.finish();
                Err(RepoError::execution(&self.query, self.invocation, source))
            }
        }
    }

    /// Stops consuming and releases the cursor immediately.
    pub fn abandon(mut self) {
        self.finish();
    }

    pub(crate) fn finish(&mut self) {
        if !self.done {
            self.done = true;
            self.cursor.release();
        }
    }

    /// Adapts the sequence to a [`futures::Stream`].
    pub fn into_stream(self) -> impl Stream<Item = Result<Row>> + Send {
        futures::stream::unfold(self, |mut rows| async move {
            match rows.try_next().await {
                Ok(Some(row)) => Some((Ok(row), rows)),
                Ok(None) => None,
                Err(e) => Some((Err(e), rows)),
            }
        })
    }
}

impl Drop for RowStream {
    fn drop(&mut self) {
        self.finish();
    }
}

/// A [`RowStream`] with a per-row mapping applied as elements are pulled.
///
/// Mapping is row-local: no row influences the mapping of another, and
/// abandoned rows are never mapped.
pub struct MappedStream<T> {
    rows: RowStream,
    map: Box<dyn Fn(Row) -> Result<T> + Send + Sync>,
}

impl<T> std::fmt::Debug for MappedStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedStream").finish_non_exhaustive()
    }
}

impl<T> MappedStream<T> {
    pub(crate) fn new(
        rows: RowStream,
        map: impl Fn(Row) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            rows,
            map: Box::new(map),
        }
    }

    pub async fn try_next(&mut self) -> Result<Option<T>> {
        match self.rows.try_next().await? {
            Some(row) => match (self.map)(row) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    self.rows.finish();
                    Err(e)
                }
            },
            None => Ok(None),
        }
    }

    /// Drains the remaining sequence into memory. Prefer pulling row by
    /// row for unbounded results.
    pub async fn try_collect(mut self) -> Result<Vec<T>> {
        let mut out = Vec::new();
        while let Some(value) = self.try_next().await? {
            out.push(value);
        }
        Ok(out)
    }

    pub fn abandon(self) {
        self.rows.abandon();
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<T>> + Send
    where
        T: Send + 'static,
    {
        futures::stream::unfold(self, |mut items| async move {
            match items.try_next().await {
                Ok(Some(value)) => Some((Ok(value), items)),
                Ok(None) => None,
                Err(e) => Some((Err(e), items)),
            }
        })
    }
}
