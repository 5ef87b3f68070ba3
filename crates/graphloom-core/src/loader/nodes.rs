//! Node Loader

use tracing::{debug, info, warn};

use crate::error::{LoadError, SourceError};
use crate::record::RecordStream;
use crate::report::NodeLoadReport;
use crate::schema::NodeType;
use crate::store::{GraphStore, UpsertOutcome};

/// Upsert one node of `node_type` per valid record
///
/// Invalid records are skipped and logged in the report. Store failures abort
/// the load so the orchestrator can retry the run.
pub async fn load_nodes(
    store: &dyn GraphStore,
    node_type: &NodeType,
    records: RecordStream,
) -> Result<NodeLoadReport, LoadError> {
    let label = node_type.label();
    let mut report = NodeLoadReport::new(label);

    for item in records {
        let record = match item {
            Ok(record) => record,
            Err(err) if err.is_record_level() => {
                report.records_read += 1;
                warn!(label, "Skipping unreadable row: {}", err);
                let line = match &err {
                    SourceError::Row { line, .. } => *line,
                    _ => 0,
                };
                report.skipped.record(line, err.to_string());
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        report.records_read += 1;

        let (key, properties) = match node_type.map_record(&record) {
            Ok(mapped) => mapped,
            Err(err) => {
                warn!(label, line = record.line(), "Skipping record: {}", err);
                report.skipped.record(record.line(), err.to_string());
                continue;
            }
        };

        match store.upsert_node(label, &key, &properties).await? {
            UpsertOutcome::Created => report.created += 1,
            UpsertOutcome::Matched => {
                debug!(label, %key, "Overwrote existing node");
                report.updated += 1;
            }
        }
    }

    info!(
        label,
        read = report.records_read,
        created = report.created,
        updated = report.updated,
        skipped = report.skipped.count,
        "Loaded nodes"
    );
    Ok(report)
}
