//! Derived dashboard views.
//!
//! Views are always rebuilt from a full [`Snapshot`]; nothing derived is
//! carried over from one snapshot to the next.

use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::debug;

use crate::classes::ClassSequence;
use crate::errors::Result;
use crate::profile::{build_profiles, ProfileSummary, StudentFinancialProfile};
use crate::report::{build_totals, AggregateTotals};
use crate::store::Snapshot;
use crate::types::AcademicYearId;

/// serializable dashboard for one academic year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    /// year the paid columns and received total are scoped to
    pub academic_year_id: Option<AcademicYearId>,
    pub profiles: Vec<StudentFinancialProfile>,
    pub totals: AggregateTotals,
    pub summary: ProfileSummary,
}

impl DashboardView {
    /// derive from scratch; without a selection the newest year is used
    pub fn derive(snapshot: &Snapshot, selected_year: Option<&str>, sequence: &ClassSequence) -> Self {
        let academic_year_id = selected_year
            .map(str::to_string)
            .or_else(|| snapshot.latest_academic_year().map(|y| y.academic_year_id.clone()));
        let year = academic_year_id.as_deref();

        let profiles = build_profiles(
            &snapshot.students,
            &snapshot.books,
            &snapshot.payments,
            year,
            sequence,
        );
        let totals = build_totals(&profiles, &snapshot.payments, year);
        let summary = ProfileSummary::of(&profiles);

        Self {
            academic_year_id,
            profiles,
            totals,
            summary,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// turns store snapshots into dashboard views for its own subscribers
pub struct ViewPublisher {
    sequence: ClassSequence,
    selected_year: Option<AcademicYearId>,
    latest: Option<Snapshot>,
    subscribers: Vec<Sender<DashboardView>>,
}

impl ViewPublisher {
    pub fn new(sequence: ClassSequence) -> Self {
        Self {
            sequence,
            selected_year: None,
            latest: None,
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<DashboardView> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn selected_year(&self) -> Option<&str> {
        self.selected_year.as_deref()
    }

    /// change the selected year and republish from the latest snapshot
    pub fn select_year(&mut self, academic_year_id: Option<&str>) -> Option<DashboardView> {
        self.selected_year = academic_year_id.map(str::to_string);
        let snapshot = self.latest.take()?;
        let view = self.publish(&snapshot);
        self.latest = Some(snapshot);
        Some(view)
    }

    /// derive a view from `snapshot` and send it to every subscriber
    pub fn publish(&mut self, snapshot: &Snapshot) -> DashboardView {
        let view = DashboardView::derive(snapshot, self.selected_year.as_deref(), &self.sequence);
        self.latest = Some(snapshot.clone());
        self.subscribers.retain(|tx| tx.send(view.clone()).is_ok());
        debug!(
            profiles = view.profiles.len(),
            subscribers = self.subscribers.len(),
            "dashboard republished"
        );
        view
    }

    /// handle every snapshot already queued, returning the last view
    pub fn drain(&mut self, snapshots: &Receiver<Snapshot>) -> Option<DashboardView> {
        let mut last = None;
        while let Ok(snapshot) = snapshots.try_recv() {
            last = Some(self.publish(&snapshot));
        }
        last
    }

    /// block on `snapshots` until the sending store goes away
    pub fn run(&mut self, snapshots: Receiver<Snapshot>) {
        for snapshot in snapshots {
            self.publish(&snapshot);
        }
    }
}
