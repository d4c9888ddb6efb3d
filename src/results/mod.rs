//! Results Presenter
//!
//! Holds the output of one processing run: table artifacts, the per-table
//! JSON cache, and per-table question/answer state. Artifact downloads and
//! question answering are isolated per action; a failure in one never
//! disturbs the rest of the view.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::api::types::ProcessedTable;
use crate::api::ApiClient;
use crate::error::{ClientError, Result};
use crate::workflow::ProcessOutput;

/// Question/answer state for one table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableQuestion {
    pub question: String,
    pub answer: Option<String>,
}

/// View over a completed processing run
pub struct ResultsView {
    output: ProcessOutput,
    questions: HashMap<usize, TableQuestion>,
}

impl ResultsView {
    pub fn new(output: ProcessOutput) -> Self {
        Self {
            output,
            questions: HashMap::new(),
        }
    }

    pub fn tables(&self) -> &[ProcessedTable] {
        &self.output.result.tables
    }

    pub fn total_tables(&self) -> usize {
        self.output.result.total_tables
    }

    /// Cached JSON content for a table, if its run produced a JSON artifact
    pub fn table_json(&self, index: usize) -> Option<&Value> {
        self.output.table_json.get(&index)
    }

    /// A table can only be queried when its JSON content is cached
    pub fn can_ask(&self, index: usize) -> bool {
        self.output.table_json.contains_key(&index)
    }

    pub fn question(&self, index: usize) -> Option<&TableQuestion> {
        self.questions.get(&index)
    }

    /// Record the question text for a table; any previous answer for that
    /// table is discarded.
    pub fn set_question(&mut self, index: usize, question: &str) {
        self.questions.insert(
            index,
            TableQuestion {
                question: question.to_string(),
                answer: None,
            },
        );
    }

    /// Send the stored question for `index` together with that table's
    /// cached content. Rejected before any network call when the table has
    /// no cached JSON or no question text. The answer is stored under the
    /// same index and never touches any other table's state.
    pub async fn ask_question(&mut self, client: &ApiClient, index: usize) -> Result<String> {
        let question = self
            .questions
            .get(&index)
            .map(|q| q.question.clone())
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ClientError::Validation("Please enter a question".to_string()))?;
        let content = self
            .output
            .table_json
            .get(&index)
            .ok_or(ClientError::NoTableData(index))?;

        // The endpoint expects an array of rows; wrap scalar or object
        // content in a single-element array.
        let table: Vec<Value> = match content {
            Value::Array(rows) => rows.clone(),
            other => vec![other.clone()],
        };

        let answer = client.ask(&question, &table).await?;
        if let Some(entry) = self.questions.get_mut(&index) {
            entry.answer = Some(answer.clone());
        }
        Ok(answer)
    }

    /// Merge every cached table payload into one object keyed
    /// `table_{index+1}`; tables without cached JSON are omitted.
    pub fn combined_json(&self) -> Value {
        let mut merged = serde_json::Map::new();
        for (index, content) in &self.output.table_json {
            merged.insert(format!("table_{}", index + 1), content.clone());
        }
        Value::Object(merged)
    }

    /// Write the merged payload as one JSON document.
    pub async fn save_combined_json(&self, path: &Path) -> Result<()> {
        let body = serde_json::to_vec_pretty(&self.combined_json())?;
        tokio::fs::write(path, body).await?;
        Ok(())
    }

    /// Fetch one artifact and save it under `dir`, returning the written
    /// path. Failures are reported to the caller; the view stays usable.
    pub async fn save_artifact(
        &self,
        client: &ApiClient,
        filename: &str,
        dir: &Path,
    ) -> Result<PathBuf> {
        // Strip any path components the backend put into the name.
        let name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::Validation(format!("bad artifact name: {filename}")))?;

        let bytes = client.download(filename).await?;
        tokio::fs::create_dir_all(dir).await?;
        let dest = dir.join(name);
        tokio::fs::write(&dest, bytes).await?;
        tracing::debug!(artifact = %filename, path = %dest.display(), "artifact saved");
        Ok(dest)
    }
}

/// Build a map of per-table JSON cache from raw parts, mostly useful in
/// tests and tools that bypass the workflow.
pub fn table_json_from_pairs(pairs: Vec<(usize, Value)>) -> BTreeMap<usize, Value> {
    pairs.into_iter().collect()
}
