//! Cutflow artifact (numbers-first).

use std::time::{SystemTime, UNIX_EPOCH};

use httcp_core::{Error, Result};
use httcp_selection::Cutflow;
use serde::Serialize;

/// Schema tag written into every cutflow artifact.
pub const CUTFLOW_SCHEMA_VERSION: &str = "httcp_cutflow_v0";

#[derive(Debug, Clone, Serialize)]
pub struct CutflowArtifact {
    pub schema_version: String,
    pub meta: CutflowMeta,
    /// Channel the cutflow was produced for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Step names, shared by every series.
    pub steps: Vec<String>,
    pub series: Vec<CutflowSeries>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CutflowMeta {
    pub tool: String,
    pub tool_version: String,
    pub created_unix_ms: u128,
}

/// One dataset (or data-taking period) through the cutflow.
#[derive(Debug, Clone, Serialize)]
pub struct CutflowSeries {
    pub name: String,
    /// Raw events after each step.
    pub counts: Vec<u64>,
    /// Weighted events after each step.
    pub sumw: Vec<f64>,
    /// `counts[i] / counts[0]`.
    pub efficiency: Vec<f64>,
    /// `counts[i + 1] / counts[i]`, one entry fewer than `steps`.
    pub relative_efficiency: Vec<f64>,
}

fn now_unix_ms() -> Result<u128> {
    let d = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::Computation(format!("system time error: {}", e)))?;
    Ok(d.as_millis())
}

// 0/0 stays NaN and is written as null.
fn ratio(num: u64, den: u64) -> f64 {
    num as f64 / den as f64
}

fn series(name: &str, cutflow: &Cutflow) -> CutflowSeries {
    let counts = cutflow.entries();
    let first = counts.first().copied().unwrap_or(0);
    let efficiency = counts.iter().map(|&n| ratio(n, first)).collect();
    let relative_efficiency = counts.windows(2).map(|w| ratio(w[1], w[0])).collect();
    CutflowSeries {
        name: name.to_string(),
        sumw: cutflow.sumw(),
        counts,
        efficiency,
        relative_efficiency,
    }
}

/// Build the artifact for one or more named cutflows with identical steps.
pub fn cutflow_artifact(
    channel: Option<&str>,
    cutflows: &[(String, Cutflow)],
) -> Result<CutflowArtifact> {
    let Some((first_name, first)) = cutflows.first() else {
        return Err(Error::Validation("cutflow artifact needs at least one series".to_string()));
    };
    let steps: Vec<String> = first.names().map(str::to_string).collect();

    let mut out_series = Vec::with_capacity(cutflows.len());
    for (name, cf) in cutflows {
        if cf.names().ne(steps.iter().map(String::as_str)) {
            return Err(Error::Validation(format!(
                "series '{name}' has different steps than '{first_name}'"
            )));
        }
        if out_series.iter().any(|s: &CutflowSeries| &s.name == name) {
            return Err(Error::Validation(format!("duplicate series '{name}'")));
        }
        out_series.push(series(name, cf));
    }

    Ok(CutflowArtifact {
        schema_version: CUTFLOW_SCHEMA_VERSION.to_string(),
        meta: CutflowMeta {
            tool: "httcp".to_string(),
            tool_version: httcp_core::VERSION.to_string(),
            created_unix_ms: now_unix_ms()?,
        },
        channel: channel.map(str::to_string),
        steps,
        series: out_series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use httcp_selection::CutflowStep;

    fn cutflow(names: &[&str], counts: &[u64]) -> Cutflow {
        Cutflow {
            steps: names
                .iter()
                .zip(counts)
                .map(|(n, &c)| CutflowStep {
                    name: n.to_string(),
                    entries: c,
                    sumw: c as f64 * 0.5,
                    sumw2: c as f64 * 0.25,
                })
                .collect(),
        }
    }

    #[test]
    fn efficiencies() {
        let cf = cutflow(&["Initial", "trigger", "tau_pt_20"], &[200, 100, 25]);
        let art = cutflow_artifact(Some("mutau"), &[("h_ggf_htt".to_string(), cf)]).unwrap();
        assert_eq!(art.schema_version, "httcp_cutflow_v0");
        assert_eq!(art.meta.tool, "httcp");
        assert_eq!(art.steps, vec!["Initial", "trigger", "tau_pt_20"]);

        let s = &art.series[0];
        assert_eq!(s.counts, vec![200, 100, 25]);
        assert_abs_diff_eq!(s.sumw[1], 50.0);
        assert_eq!(s.efficiency, vec![1.0, 0.5, 0.125]);
        assert_eq!(s.relative_efficiency, vec![0.5, 0.25]);
    }

    #[test]
    fn empty_selection_gives_null_efficiency() {
        let cf = cutflow(&["Initial", "trigger"], &[0, 0]);
        let art = cutflow_artifact(None, &[("empty".to_string(), cf)]).unwrap();
        let v = serde_json::to_value(&art).unwrap();
        assert!(v["series"][0]["efficiency"][0].is_null());
        assert!(v.get("channel").is_none());
    }

    #[test]
    fn series_must_share_steps() {
        let a = cutflow(&["Initial", "trigger"], &[10, 5]);
        let b = cutflow(&["Initial", "met_filter"], &[10, 5]);
        let err = cutflow_artifact(None, &[("a".to_string(), a.clone()), ("b".to_string(), b)])
            .unwrap_err();
        assert!(err.to_string().contains("series 'b' has different steps"));

        let err = cutflow_artifact(None, &[("a".to_string(), a.clone()), ("a".to_string(), a)])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate series 'a'"));
        assert!(cutflow_artifact(None, &[]).is_err());
    }
}
