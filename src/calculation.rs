use crate::errors::CalculationError;

/// Rough yield used before a live estimate is available, in kWh per kW of capacity per year.
pub const APPROX_ANNUAL_YIELD_PER_KW: i64 = 1200;
/// Usable roof area needed per kW of installed capacity, in ft².
const AREA_PER_KW: f64 = 100.;
const KWH_PER_CREDIT: f64 = 1000.;
const WATTS_PER_KW: f64 = 1000.;

/// Rounds to the nearest integer with ties going to the even neighbour.
pub(crate) fn round_half_even(value: f64) -> i64 {
    value.round_ties_even() as i64
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SystemSizing {
    /// ft²
    pub available_space: i64,
    /// kW
    pub capacity: i64,
    /// kWh per year, superseded by the live estimate
    pub approximate_energy_savings: i64,
}

pub fn size_system(
    roof_area: f64,
    available_space_ratio: f64,
) -> Result<SystemSizing, CalculationError> {
    let available_space = round_half_even(roof_area * available_space_ratio / 100.);
    let capacity = round_half_even(available_space as f64 / AREA_PER_KW);
    let approximate_energy_savings = capacity
        .checked_mul(APPROX_ANNUAL_YIELD_PER_KW)
        .ok_or(CalculationError::Overflow("approximate energy savings"))?;

    Ok(SystemSizing {
        available_space,
        capacity,
        approximate_energy_savings,
    })
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FinancialInputs {
    /// $/kWh
    pub electricity_cost: f64,
    /// $ per credit
    pub incentive_rate: f64,
    /// $/W
    pub cost_per_watt: f64,
    /// percent
    pub tax_credit_rate: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FinancialMetrics {
    pub electric_savings: i64,
    pub credits: i64,
    pub incentive_savings: i64,
    pub total_savings: i64,
    pub implementation_cost: i64,
    pub tax_credit: i64,
    pub net_cost: i64,
    /// years
    pub payback: f64,
}

pub fn derive_financials(
    capacity: i64,
    annual_energy: i64,
    inputs: &FinancialInputs,
) -> Result<FinancialMetrics, CalculationError> {
    let electric_savings = round_half_even(annual_energy as f64 * inputs.electricity_cost);
    let credits = round_half_even(annual_energy as f64 / KWH_PER_CREDIT);
    let incentive_savings = round_half_even(inputs.incentive_rate * credits as f64);
    let total_savings = electric_savings
        .checked_add(incentive_savings)
        .ok_or(CalculationError::Overflow("total annual savings"))?;

    let implementation_cost =
        round_half_even(capacity as f64 * inputs.cost_per_watt * WATTS_PER_KW);
    let tax_credit = round_half_even(implementation_cost as f64 * inputs.tax_credit_rate / 100.);
    let net_cost = implementation_cost
        .checked_sub(tax_credit)
        .ok_or(CalculationError::Overflow("net implementation cost"))?;

    Ok(FinancialMetrics {
        electric_savings,
        credits,
        incentive_savings,
        total_savings,
        implementation_cost,
        tax_credit,
        net_cost,
        payback: payback(total_savings, net_cost)?,
    })
}

/// Simple payback period in years, to one decimal place.
///
/// Savings must be positive. A project with no net cost pays back immediately.
pub fn payback(annual_savings: i64, net_cost: i64) -> Result<f64, CalculationError> {
    if annual_savings <= 0 {
        return Err(CalculationError::NonPositiveSavings(annual_savings));
    }
    if net_cost <= 0 {
        return Ok(0.);
    }

    Ok((net_cost as f64 / annual_savings as f64 * 10.).round_ties_even() / 10.)
}
