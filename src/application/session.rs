//! Analysis Session
//!
//! Interactive state for one operator: the ticker form, whether it has been
//! submitted, the spread fetched on submission and the latest report.
//! Changing risk aversion or wealth re-runs the core on the fetched spread
//! without touching the provider; only a new submission refetches.

use chrono::Utc;

use super::analyzer::{analyze_pair, AnalysisError, FetchedPair, PairAnalyzer, PairRequest};
use super::report::AnalysisReport;
use crate::ports::market_data::{PriceHistoryPort, SamplingMode};
use crate::strategy::AnalysisSettings;

/// Ticker form as the operator fills it in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairForm {
    pub ticker1: String,
    pub ticker2: String,
    pub intraday: bool,
}

impl Default for PairForm {
    fn default() -> Self {
        Self {
            ticker1: "RB=F".to_string(),
            ticker2: "HO=F".to_string(),
            intraday: false,
        }
    }
}

impl PairForm {
    pub fn to_request(&self) -> PairRequest {
        PairRequest::new(
            self.ticker1.trim(),
            self.ticker2.trim(),
            SamplingMode::from_intraday_flag(self.intraday),
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisSession {
    form: PairForm,
    settings: AnalysisSettings,
    submitted: bool,
    fetched: Option<FetchedPair>,
    report: Option<AnalysisReport>,
}

impl AnalysisSession {
    pub fn new(form: PairForm, settings: AnalysisSettings) -> Self {
        Self {
            form,
            settings,
            ..Self::default()
        }
    }

    pub fn form(&self) -> &PairForm {
        &self.form
    }

    /// Edit the form; takes effect on the next `submit`
    pub fn set_form(&mut self, form: PairForm) {
        self.form = form;
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn fetched(&self) -> Option<&FetchedPair> {
        self.fetched.as_ref()
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        self.report.as_ref()
    }

    /// Fetch the pair in the form and analyze it with the current settings
    ///
    /// A failed fetch leaves the session unsubmitted and clears the old results.
    pub async fn submit<P: PriceHistoryPort>(
        &mut self,
        analyzer: &PairAnalyzer<P>,
    ) -> Result<&AnalysisReport, AnalysisError> {
        self.settings.validate()?;
        self.submitted = false;
        self.fetched = None;
        self.report = None;

        let pair = analyzer.fetch_pair(&self.form.to_request(), Utc::now()).await?;
        self.submitted = true;
        let report = analyze_pair(&pair, &self.settings);
        self.fetched = Some(pair);
        Ok(self.report.insert(report?))
    }

    /// Re-run estimation and simulation on the fetched spread with new settings
    pub fn rerun_with(
        &mut self,
        settings: AnalysisSettings,
    ) -> Result<&AnalysisReport, AnalysisError> {
        let pair = self.fetched.as_ref().ok_or(AnalysisError::NotSubmitted)?;
        let report = analyze_pair(pair, &settings)?;
        self.settings = settings;
        Ok(self.report.insert(report))
    }
}
