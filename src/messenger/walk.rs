//! Subtree walks over GETNEXT and GETBULK.

use tracing::instrument;

use super::Messenger;
use crate::error::Result;
use crate::oid::Oid;
use crate::pdu::Pdu;
use crate::transport::Transport;
use crate::variable::Variable;

/// Where a walk stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WalkMode {
    /// Stop at the first OID outside the root's subtree.
    #[default]
    WithinSubtree,
    /// Continue past the subtree until the end of the MIB view.
    Default,
}

/// Whether a walk keeps `variable` and continues after it.
///
/// The walk ends on an exception value, on an OID that does not increase,
/// and (in [`WalkMode::WithinSubtree`]) on leaving the root's subtree.
fn continues(mode: WalkMode, root: &Oid, previous: &Oid, variable: &Variable) -> bool {
    if variable.data.is_exception() {
        return false;
    }
    if mode == WalkMode::WithinSubtree && !variable.id.starts_with(root) {
        return false;
    }
    if variable.id <= *previous {
        tracing::debug!(target: "snmp_messenger::messenger", { previous = %previous, current = %variable.id }, "walk stopped on non-increasing OID");
        return false;
    }
    true
}

impl<T: Transport> Messenger<T> {
    /// Walk `root` with GETNEXT, appending to `results`.
    ///
    /// Returns the number of variables appended. An error-status reply
    /// ends the walk normally. On `Err`, `results` keeps what was gathered.
    #[instrument(skip(self, results), err, fields(snmp.target = %self.peer_addr(), snmp.oid = %root))]
    pub async fn walk_into(&self, root: &Oid, results: &mut Vec<Variable>) -> Result<usize> {
        let mode = self.inner.config.walk_mode;
        let start = results.len();
        let mut last = root.clone();

        loop {
            let pdu = Pdu::get_next_request(self.next_request_id(), std::slice::from_ref(&last));
            let response = self.request(pdu).await?;
            if response.is_error() {
                tracing::debug!(target: "snmp_messenger::messenger", { snmp.error_status = response.error_status }, "walk ended by error status");
                break;
            }
            let Some(variable) = response.variables.into_iter().next() else {
                break;
            };
            if !continues(mode, root, &last, &variable) {
                break;
            }
            last = variable.id.clone();
            results.push(variable);
        }

        Ok(results.len() - start)
    }

    /// Walk `root` with GETBULK (non-repeaters 0, max-repetitions from the
    /// configuration), appending to `results`.
    ///
    /// Same termination rules as [`walk_into`](Self::walk_into). Fails with
    /// [`Error::Config`](crate::Error::Config) on SNMPv1.
    #[instrument(skip(self, results), err, fields(snmp.target = %self.peer_addr(), snmp.oid = %root))]
    pub async fn bulk_walk_into(&self, root: &Oid, results: &mut Vec<Variable>) -> Result<usize> {
        let mode = self.inner.config.walk_mode;
        let max_repetitions = i32::try_from(self.inner.config.max_repetitions).unwrap_or(i32::MAX);
        let start = results.len();
        let mut last = root.clone();

        'rounds: loop {
            let pdu = Pdu::get_bulk(
                self.next_request_id(),
                0,
                max_repetitions,
                std::slice::from_ref(&last),
            );
            let response = self.request(pdu).await?;
            if response.is_error() || response.variables.is_empty() {
                break;
            }
            for variable in response.variables {
                if !continues(mode, root, &last, &variable) {
                    break 'rounds;
                }
                last = variable.id.clone();
                results.push(variable);
            }
        }

        Ok(results.len() - start)
    }

    /// Walk `root` with GETNEXT.
    pub async fn walk(&self, root: &Oid) -> Result<Vec<Variable>> {
        let mut results = Vec::new();
        self.walk_into(root, &mut results).await?;
        Ok(results)
    }

    /// Walk `root` with GETBULK.
    pub async fn bulk_walk(&self, root: &Oid) -> Result<Vec<Variable>> {
        let mut results = Vec::new();
        self.bulk_walk_into(root, &mut results).await?;
        Ok(results)
    }
}
