use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use super::schedule::{self, TrancheSchedule};
use super::waterfall::allocate_sweep;
use crate::assumptions::{check_ranges, Assumptions, CurveField, NwcMode, RangePolicy, MAX_PERIODS};
use crate::error::PaydownError;
use crate::types::*;
use crate::PaydownResult;

/// Per-tranche slice of a projection period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrancheRow {
    pub name: String,
    pub beginning_balance: Money,
    pub interest: Money,
    pub mandatory_amort: Money,
    pub sweep: Money,
    pub ending_balance: Money,
}

/// A single period of the projection. Period 0 is the LTM row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRow {
    pub period: u32,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_end: Option<NaiveDate>,
    pub is_ltm: bool,

    pub revenue: Money,
    pub gross_ebitda: Money,
    pub adjustments: Money,
    pub adj_ebitda: Money,
    /// Adjusted EBITDA margin, whole-number percent
    pub margin: Percent,
    pub da: Money,
    pub ebit: Money,
    pub interest: Money,
    pub pre_tax_income: Money,
    pub taxes: Money,
    pub net_income: Money,
    pub capex: Money,
    pub nwc_change: Money,
    pub fcf_before_sweep: Money,

    pub mandatory_amort: Money,
    /// Cash earmarked for the sweep before the waterfall caps it
    pub sweep_available: Money,
    /// Sweep actually applied to principal
    pub sweep: Money,
    pub beginning_debt: Money,
    pub ending_debt: Money,
    pub tranches: Vec<TrancheRow>,

    pub leverage_ratio: Multiple,
    pub dscr: Multiple,
    pub interest_coverage: Multiple,
}

impl ProjectionRow {
    pub fn debt_service(&self) -> Money {
        self.interest.saturating_add(self.mandatory_amort)
    }

    /// DSCR is only meaningful while there is debt service to cover.
    pub fn has_debt_service(&self) -> bool {
        self.debt_service() > Decimal::ZERO
    }
}

/// Record of a per-period curve lookup that fell back to its default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackUse {
    pub period: u32,
    pub field: CurveField,
    pub value: Percent,
}

/// Headline figures across the forward years
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSummary {
    pub initial_debt: Money,
    pub exit_debt: Money,
    pub exit_leverage: Multiple,
    pub peak_leverage: Multiple,
    /// Lowest DSCR across years with debt service
    pub min_dscr: Multiple,
    /// Mean DSCR across years with debt service
    pub average_dscr: Multiple,
    pub cumulative_interest: Money,
    pub cumulative_amortisation: Money,
    pub cumulative_sweep: Money,
    pub exit_adj_ebitda: Money,
    /// `(initial − exit) / initial × 100`
    pub paydown_percent: Percent,
}

/// Full projection output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionOutput {
    pub rows: Vec<ProjectionRow>,
    pub summary: ProjectionSummary,
    pub debt_schedules: Vec<TrancheSchedule>,
    pub fallbacks_used: Vec<FallbackUse>,
}

/// Projection result plus the warnings raised while producing it
#[derive(Debug, Clone)]
pub struct ProjectionRun {
    pub output: ProjectionOutput,
    pub warnings: Vec<String>,
}

struct TrancheState {
    name: String,
    original: Money,
    rate: Percent,
    amort_rate: Percent,
    balance: Money,
}

/// Run the debt paydown projection, returning the LTM row plus one row per
/// forward year wrapped in the standard output envelope.
pub fn project(input: &Assumptions) -> PaydownResult<ComputationOutput<ProjectionOutput>> {
    let start = Instant::now();
    let run = run_projection(input)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Debt Paydown Projection",
        &serde_json::json!({
            "ltm_revenue": input.ltm_revenue.to_string(),
            "ltm_ebitda": input.ltm_ebitda.to_string(),
            "periods": input.periods,
            "num_tranches": run.output.rows[0].tranches.len(),
            "initial_debt": run.output.summary.initial_debt.to_string(),
            "cash_sweep_percent": input.cash_sweep_percent.to_string(),
        }),
        run.warnings,
        elapsed,
        run.output,
    ))
}

/// The recurrence itself. Every analysis calls this on its own derived copy
/// of the assumptions.
pub fn run_projection(input: &Assumptions) -> PaydownResult<ProjectionRun> {
    let mut warnings: Vec<String> = Vec::new();

    if input.periods > MAX_PERIODS {
        return Err(PaydownError::InvalidInput {
            field: "periods".into(),
            reason: format!("Horizon of {} years exceeds the {MAX_PERIODS}-year limit", input.periods),
        });
    }

    // ─── Range policy ────────────────────────────────────────────────
    let issues = check_ranges(input);
    if let Some(first) = issues.first() {
        if input.range_policy == RangePolicy::Reject {
            return Err(PaydownError::InvalidInput {
                field: first.field.clone(),
                reason: format!("{} (got {})", first.reason, first.value),
            });
        }
        for issue in &issues {
            warn!(field = %issue.field, value = %issue.value, "out-of-range input passed through");
            warnings.push(format!("Out-of-range input {issue}"));
        }
    }

    let mut tranches: Vec<TrancheState> = input
        .tranches()
        .into_iter()
        .filter(|t| t.enabled)
        .map(|t| {
            let original = t.amount.max(Decimal::ZERO);
            TrancheState {
                name: t.name,
                original,
                rate: t.interest_rate,
                amort_rate: t.amort_rate,
                balance: original,
            }
        })
        .collect();

    if tranches.is_empty() {
        warnings.push("No enabled debt tranches; projecting an unlevered case".into());
    }

    debug!(
        periods = input.periods,
        tranches = tranches.len(),
        "running debt paydown projection"
    );

    let initial_debt = try_sum(tranches.iter().map(|t| t.balance), "initial_debt")?;
    let mut rows: Vec<ProjectionRow> = Vec::with_capacity(input.periods as usize + 1);
    rows.push(ltm_row(input, &tranches, initial_debt));

    let mut fallbacks_used: Vec<FallbackUse> = Vec::new();
    let mut prev_revenue = input.ltm_revenue;
    let mut prev_nwc = match &input.nwc {
        NwcMode::PercentOfRevenue { percent } => input.ltm_revenue.try_mul(pct(*percent), "nwc")?,
        _ => Decimal::ZERO,
    };

    for year in 1..=input.periods {
        let idx = (year - 1) as usize;
        let mut curve = |field: CurveField| {
            let r = input.resolve(field, idx);
            if r.fallback {
                debug!(period = year, field = field.name(), value = %r.value, "curve fallback applied");
                fallbacks_used.push(FallbackUse {
                    period: year,
                    field,
                    value: r.value,
                });
            }
            r.value
        };
        let growth = curve(CurveField::RevenueGrowth);
        let margin = curve(CurveField::EbitdaMargin);
        let capex_pct = curve(CurveField::CapexPercent);

        // Operating line
        let revenue = prev_revenue.try_mul(Decimal::ONE + pct(growth), "revenue")?;
        let gross_ebitda = revenue.try_mul(pct(margin), "gross_ebitda")?;
        let adjustments = input.adjustment_at(idx)?;
        let adj_ebitda = gross_ebitda.try_add(adjustments, "adj_ebitda")?;
        let da = revenue.try_mul(pct(input.da_percent), "da")?;
        let ebit = adj_ebitda.try_sub(da, "ebit")?;

        // Interest on opening balances
        let beginning: Vec<Money> = tranches.iter().map(|t| t.balance).collect();
        let interest = tranches
            .iter()
            .map(|t| t.balance.try_mul(pct(t.rate), "interest"))
            .collect::<PaydownResult<Vec<Money>>>()?;
        let total_interest = try_sum(interest.iter().copied(), "interest")?;

        let pre_tax_income = ebit.try_sub(total_interest, "pre_tax_income")?;
        let taxes = pre_tax_income
            .try_mul(pct(input.tax_rate), "taxes")?
            .max(Decimal::ZERO);
        let net_income = pre_tax_income.try_sub(taxes, "net_income")?;

        let capex = revenue.try_mul(pct(capex_pct), "capex")?;

        let nwc_change = match &input.nwc {
            NwcMode::None => Decimal::ZERO,
            NwcMode::PercentOfRevenue { percent } => {
                let current = revenue.try_mul(pct(*percent), "nwc")?;
                let change = current.try_sub(prev_nwc, "nwc_change")?;
                prev_nwc = current;
                change
            }
            NwcMode::Manual { values } => match values.get(idx) {
                Some(v) => *v,
                None => {
                    warnings.push(format!("Year {year}: no manual NWC value; using 0"));
                    Decimal::ZERO
                }
            },
        };

        // Mandatory amortisation runs off original principal
        let amort = tranches
            .iter()
            .map(|t| -> PaydownResult<Money> {
                let scheduled = t.original.try_mul(pct(t.amort_rate), "mandatory_amort")?;
                Ok(scheduled.max(Decimal::ZERO).min(t.balance))
            })
            .collect::<PaydownResult<Vec<Money>>>()?;
        // Bounded by the opening balances, which sum to at most initial debt.
        let total_amort: Money = amort.iter().copied().sum();

        let fcf_before_sweep = net_income
            .try_add(da, "fcf_before_sweep")?
            .try_sub(capex, "fcf_before_sweep")?
            .try_sub(nwc_change, "fcf_before_sweep")?
            .try_sub(total_amort, "fcf_before_sweep")?;

        // Excess cash sweep, senior first
        let sweep_available = fcf_before_sweep
            .max(Decimal::ZERO)
            .try_mul(pct(input.cash_sweep_percent), "sweep_available")?;
        let capacities: Vec<Money> = beginning
            .iter()
            .zip(&amort)
            .map(|(b, a)| *b - *a)
            .collect();
        let sweep = allocate_sweep(sweep_available, &capacities);
        let total_sweep: Money = sweep.iter().copied().sum();

        let mut tranche_rows = Vec::with_capacity(tranches.len());
        for (i, t) in tranches.iter_mut().enumerate() {
            t.balance = (beginning[i] - amort[i] - sweep[i]).max(Decimal::ZERO);
            tranche_rows.push(TrancheRow {
                name: t.name.clone(),
                beginning_balance: beginning[i],
                interest: interest[i],
                mandatory_amort: amort[i],
                sweep: sweep[i],
                ending_balance: t.balance,
            });
        }

        let beginning_debt: Money = beginning.iter().copied().sum();
        let ending_debt: Money = tranches.iter().map(|t| t.balance).sum();

        if fcf_before_sweep < Decimal::ZERO {
            warnings.push(format!(
                "Year {year}: negative free cash flow of {}",
                fcf_before_sweep.round_dp(2)
            ));
        }

        rows.push(ProjectionRow {
            period: year,
            label: input.period_label(year),
            period_end: input.period_end(year),
            is_ltm: false,
            revenue,
            gross_ebitda,
            adjustments,
            adj_ebitda,
            margin: percent_or_zero(adj_ebitda, revenue),
            da,
            ebit,
            interest: total_interest,
            pre_tax_income,
            taxes,
            net_income,
            capex,
            nwc_change,
            fcf_before_sweep,
            mandatory_amort: total_amort,
            sweep_available,
            sweep: total_sweep,
            beginning_debt,
            ending_debt,
            tranches: tranche_rows,
            leverage_ratio: ratio_or_zero(ending_debt, adj_ebitda),
            dscr: ratio_or_zero(adj_ebitda, total_interest.try_add(total_amort, "debt_service")?),
            interest_coverage: ratio_or_zero(adj_ebitda, total_interest),
        });

        prev_revenue = revenue;
    }

    if !fallbacks_used.is_empty() {
        warnings.push(format!(
            "{} curve value(s) missing; defaults applied (margin {}%, capex {}%, growth {}%)",
            fallbacks_used.len(),
            input.fallbacks.ebitda_margin,
            input.fallbacks.capex_percent,
            input.fallbacks.revenue_growth,
        ));
    }

    let summary = summarise(&rows, initial_debt)?;
    let debt_schedules = schedule::tranche_schedules(&rows);

    Ok(ProjectionRun {
        output: ProjectionOutput {
            rows,
            summary,
            debt_schedules,
            fallbacks_used,
        },
        warnings,
    })
}

fn ltm_row(input: &Assumptions, tranches: &[TrancheState], initial_debt: Money) -> ProjectionRow {
    ProjectionRow {
        period: 0,
        label: input.period_label(0),
        period_end: input.period_end(0),
        is_ltm: true,
        revenue: input.ltm_revenue,
        gross_ebitda: input.ltm_ebitda,
        adjustments: Decimal::ZERO,
        adj_ebitda: input.ltm_ebitda,
        margin: percent_or_zero(input.ltm_ebitda, input.ltm_revenue),
        da: Decimal::ZERO,
        ebit: Decimal::ZERO,
        interest: Decimal::ZERO,
        pre_tax_income: Decimal::ZERO,
        taxes: Decimal::ZERO,
        net_income: Decimal::ZERO,
        capex: Decimal::ZERO,
        nwc_change: Decimal::ZERO,
        fcf_before_sweep: Decimal::ZERO,
        mandatory_amort: Decimal::ZERO,
        sweep_available: Decimal::ZERO,
        sweep: Decimal::ZERO,
        beginning_debt: initial_debt,
        ending_debt: initial_debt,
        tranches: tranches
            .iter()
            .map(|t| TrancheRow {
                name: t.name.clone(),
                beginning_balance: t.balance,
                interest: Decimal::ZERO,
                mandatory_amort: Decimal::ZERO,
                sweep: Decimal::ZERO,
                ending_balance: t.balance,
            })
            .collect(),
        leverage_ratio: ratio_or_zero(initial_debt, input.ltm_ebitda),
        dscr: Decimal::ZERO,
        interest_coverage: Decimal::ZERO,
    }
}

fn summarise(rows: &[ProjectionRow], initial_debt: Money) -> PaydownResult<ProjectionSummary> {
    let forward = &rows[1..];
    let last = &rows[rows.len() - 1];

    let serviced: Vec<Multiple> = forward
        .iter()
        .filter(|r| r.has_debt_service())
        .map(|r| r.dscr)
        .collect();

    Ok(ProjectionSummary {
        initial_debt,
        exit_debt: last.ending_debt,
        exit_leverage: last.leverage_ratio,
        peak_leverage: forward
            .iter()
            .map(|r| r.leverage_ratio)
            .max()
            .unwrap_or(Decimal::ZERO),
        min_dscr: serviced.iter().copied().min().unwrap_or(Decimal::ZERO),
        average_dscr: round_ratio(mean(&serviced)),
        cumulative_interest: try_sum(forward.iter().map(|r| r.interest), "cumulative_interest")?,
        cumulative_amortisation: try_sum(forward.iter().map(|r| r.mandatory_amort), "cumulative_amortisation")?,
        cumulative_sweep: try_sum(forward.iter().map(|r| r.sweep), "cumulative_sweep")?,
        exit_adj_ebitda: last.adj_ebitda,
        paydown_percent: percent_or_zero(initial_debt - last.ending_debt, initial_debt),
    })
}
