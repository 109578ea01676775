pub mod calculation;
pub mod document;
pub mod errors;
pub mod estimate;
pub mod formatting;
pub mod input;
pub mod manual_entry;
pub mod output;
pub mod report;


use crate::calculation::{
    derive_financials, size_system, FinancialInputs, FinancialMetrics, SystemSizing,
};
use crate::errors::{EstimateError, RecommendationError};
use crate::estimate::{EnergyEstimator, EstimateRequest, MonthlyProduction};
use crate::formatting::{format_fields, NumberFormat};
use crate::input::Parameters;
use crate::manual_entry::ManualEntry;
use crate::output::Output;
use crate::report::{
    fill_monthly_table, load_document, placeholder_fields, warn_unresolved, TemplateSource,
};
use bitflags::bitflags;
use tracing::{info, warn};

bitflags! {
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct RunFlags: u8 {
        /// Abort instead of asking the operator when the estimate cannot be fetched.
        const ABORT_ON_ESTIMATE_FAILURE = 0b001;
        /// After a failed estimate, also ask the operator for the monthly series.
        const PROMPT_MONTHLY_ON_FALLBACK = 0b010;
        /// Leave the monthly table empty rather than failing when no monthly series exists.
        const ALLOW_MISSING_MONTHLY = 0b100;
    }
}

impl Default for RunFlags {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub flags: RunFlags,
    pub number_format: NumberFormat,
    /// Shown in the report as the month it was prepared, e.g. "October 2026".
    pub current_month: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EstimateSource {
    Service,
    Manual,
}

/// Everything derived for one recommendation.
#[derive(Clone, Debug, PartialEq)]
pub struct Recommendation {
    pub sizing: SystemSizing,
    pub incentive_rate: f64,
    /// kWh per year
    pub annual_energy: i64,
    pub estimate_source: EstimateSource,
    pub monthly: Option<MonthlyProduction>,
    pub financials: FinancialMetrics,
}

#[derive(Debug)]
pub struct RecommendationOutcome {
    pub recommendation: Recommendation,
    /// Key the report was saved under (the report identifier).
    pub output_key: String,
    pub document: String,
}

/// Derives every metric for the given parameters, consulting the estimator and, if that fails,
/// the operator.
pub fn calculate_recommendation(
    parameters: &Parameters,
    estimator: &impl EnergyEstimator,
    manual_entry: &mut impl ManualEntry,
    flags: RunFlags,
) -> Result<Recommendation, RecommendationError> {
    let incentive_rate = parameters.incentive_rate()?;
    let sizing = size_system(parameters.roof_area, parameters.available_space_ratio)?;

    let request = EstimateRequest {
        api_key: &parameters.api_key,
        system_capacity: sizing.capacity,
        address: &parameters.zip,
    };
    let (annual_energy, monthly, estimate_source) = match estimator.estimate(&request) {
        Ok(estimate) => (
            calculation::round_half_even(estimate.annual_ac_energy),
            Some(estimate.monthly),
            EstimateSource::Service,
        ),
        Err(e) => fallback_estimate(e, manual_entry, flags)?,
    };

    let financials = derive_financials(
        sizing.capacity,
        annual_energy,
        &FinancialInputs {
            electricity_cost: parameters.electricity_cost,
            incentive_rate,
            cost_per_watt: parameters.cost_per_watt,
            tax_credit_rate: parameters.tax_credit_rate,
        },
    )?;

    Ok(Recommendation {
        sizing,
        incentive_rate,
        annual_energy,
        estimate_source,
        monthly,
        financials,
    })
}

fn fallback_estimate(
    error: EstimateError,
    manual_entry: &mut impl ManualEntry,
    flags: RunFlags,
) -> Result<(i64, Option<MonthlyProduction>, EstimateSource), RecommendationError> {
    if flags.contains(RunFlags::ABORT_ON_ESTIMATE_FAILURE) {
        return Err(error.into());
    }
    warn!("falling back to manual entry after estimate failure: {error}");

    let annual_energy = manual_entry.annual_energy(&error)?;
    let monthly = if flags.contains(RunFlags::PROMPT_MONTHLY_ON_FALLBACK) {
        manual_entry.monthly_production()?
    } else {
        None
    };

    Ok((annual_energy, monthly, EstimateSource::Manual))
}

/// Calculates the recommendation, fills the site type's template and saves it under the report
/// identifier.
///
/// The document is fully rendered before the output is opened, so a failure at any earlier
/// step leaves nothing written.
pub fn run_recommendation(
    parameters: &Parameters,
    estimator: &impl EnergyEstimator,
    manual_entry: &mut impl ManualEntry,
    templates: &impl TemplateSource,
    output: impl Output,
    options: &RunOptions,
) -> Result<RecommendationOutcome, RecommendationError> {
    let recommendation =
        calculate_recommendation(parameters, estimator, manual_entry, options.flags)?;

    let template_name = parameters.site_type.template_name();
    let mut document = load_document(templates, template_name)?;

    let fields = placeholder_fields(parameters, &recommendation, &options.current_month);
    document.replace_placeholders(&format_fields(&fields, &options.number_format));
    warn_unresolved(&document, template_name);

    if recommendation.monthly.is_none()
        && options.flags.contains(RunFlags::ALLOW_MISSING_MONTHLY)
    {
        warn!(
            "no monthly production series, leaving the monthly table of {template_name} unfilled"
        );
    } else {
        fill_monthly_table(
            &mut document,
            recommendation.monthly.as_ref(),
            &options.number_format,
        )?;
    }

    let rendered = document.render();
    let output_key = parameters.report_id.clone();
    if !output.is_noop() {
        output
            .save(&output_key, rendered.as_bytes())
            .map_err(RecommendationError::Output)?;
    }
    info!(
        "recommendation {output_key}: {} kW, payback {} years",
        recommendation.sizing.capacity, recommendation.financials.payback
    );

    Ok(RecommendationOutcome {
        recommendation,
        output_key,
        document: rendered,
    })
}
