//! Fmax search (spec §4.9.1): binary-search-like frequency sweep with an
//! optional per-flow "strategy variation" dimension.
//!
//! Grounded on
//! `original_source/src/xeda/flow_runner/dse/fmax.py`'s `FmaxOptimizer`.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use serde_json::{json, Map, Value};

use crate::optimizer::{Optimizer, OptimizerState};
use crate::outcome::FlowOutcome;

/// `FmaxOptimizer.Settings` (spec §4.9.1). `init_freq_high` must exceed
/// `init_freq_low`; callers should use [`FmaxSettings::new`] rather than
/// constructing this directly to get that check for free.
#[derive(Debug, Clone)]
pub struct FmaxSettings {
    pub init_freq_low: f64,
    pub init_freq_high: f64,
    pub max_luts: Option<u64>,
    pub init_num_variations: u32,
    pub delta: f64,
    pub resolution: f64,
    pub min_freq_step: f64,
    pub variation_min_improv: f64,
}

impl FmaxSettings {
    pub fn new(init_freq_low: f64, init_freq_high: f64) -> Result<Self, crate::error::DseError> {
        if !(init_freq_high > init_freq_low) {
            return Err(crate::error::DseError::InvalidFrequencyWindow {
                low: init_freq_low,
                high: init_freq_high,
            });
        }
        Ok(Self {
            init_freq_low,
            init_freq_high,
            max_luts: None,
            init_num_variations: 1,
            delta: 0.001,
            resolution: 0.2,
            min_freq_step: 0.02,
            variation_min_improv: 2.0,
        })
    }
}

/// `linspace(a, b, n)` (spec §4.9.1): `n` evenly spaced samples in
/// `[a, b]`, plus the step between them. Mirrors `dse_runner.py`'s
/// `linspace`, not numpy's (no endpoint-exclusive option, `n < 2`
/// degenerates to `[b]`).
fn linspace(a: f64, b: f64, n: usize) -> (Vec<f64>, f64) {
    if n < 2 {
        return (vec![b], 0.0);
    }
    let step = (b - a) / (n - 1) as f64;
    let values = (0..n).map(|i| step * i as f64 + a).collect();
    (values, step)
}

/// Frequency sweep + per-flow variation picker, implementing the
/// `FmaxOptimizer` algorithm from `dse/fmax.py` over the [`Optimizer`]
/// trait.
pub struct FmaxOptimizer {
    pub state: OptimizerState,
    pub settings: FmaxSettings,
    /// Flow-specific setting-key -> candidate values, e.g.
    /// `"synth.strategy" -> ["Flow_AlternateRoutability", ...]`. Ordered
    /// so index 0 is always tried first; [`FmaxOptimizer::process_outcome`]
    /// promotes a winning value to the front.
    pub variations: HashMap<String, Vec<Value>>,

    no_improvements: u32,
    freq_step: f64,
    last_improvement: f64,
    num_iterations: u32,
    last_best_freq: f64,
    num_variations: u32,
    lo_freq: f64,
    hi_freq: f64,
    batch_hashes: HashSet<String>,
    variation_choices: Vec<HashMap<String, usize>>,
}

impl FmaxOptimizer {
    pub fn new(max_workers: usize, base_settings: Value, settings: FmaxSettings) -> Self {
        let lo_freq = settings.init_freq_low;
        let hi_freq = settings.init_freq_high;
        let num_variations = settings.init_num_variations;
        Self {
            state: OptimizerState::new(max_workers, base_settings),
            settings,
            variations: HashMap::new(),
            no_improvements: 0,
            freq_step: 0.0,
            last_improvement: 0.0,
            num_iterations: 0,
            last_best_freq: 0.0,
            num_variations,
            lo_freq,
            hi_freq,
            batch_hashes: HashSet::new(),
            variation_choices: Vec::new(),
        }
    }

    fn get_result_value(results: &FlowOutcome) -> Option<f64> {
        results.result_f64("Fmax")
    }

    fn best_freq(&self) -> Option<f64> {
        self.state.best.as_ref().and_then(Self::get_result_value)
    }

    /// `update_bounds` (spec §4.9.1): narrows or widens `[lo_freq,
    /// hi_freq]` from the previous iteration's outcome before the next
    /// batch is drawn. Returns `false` to stop the search.
    fn update_bounds(&mut self) -> bool {
        if self.num_iterations == 0 {
            return true;
        }
        let resolution = self.settings.resolution;
        let max_workers = self.state.max_workers as f64;
        let delta = self.settings.delta;
        let best_freq = self.best_freq();

        if self.hi_freq - self.lo_freq < resolution && self.no_improvements > 1 {
            return false;
        }

        let mut rng = rand::thread_rng();

        if best_freq.is_some() || self.state.failed_fmax.map_or(false, |f| f > self.lo_freq) {
            if self.state.improved_idx.is_none()
                || (self.last_improvement > 0.0 && self.last_improvement < self.settings.variation_min_improv)
            {
                self.num_variations += 1;
            } else if self.state.improved_idx.unwrap_or(0) > (self.state.max_workers + 1) / 2
                || self.last_improvement > 2.0 * self.settings.variation_min_improv
            {
                if self.num_variations > 1 {
                    self.num_variations -= 1;
                }
            }
        }

        if let Some(best_freq) = best_freq {
            let epsilon = rng.gen_range(delta..=delta.max(resolution / (self.num_variations as f64 + 2.0)));
            self.lo_freq = best_freq + epsilon;
        }

        if self.state.improved_idx.is_none() {
            self.no_improvements += 1;
            if let Some(best_freq) = best_freq {
                if best_freq < self.hi_freq {
                    if self.num_variations > 1 && self.no_improvements < 3 {
                        self.hi_freq += ((max_workers + 1.0) * resolution / self.num_variations as f64).floor();
                    } else {
                        self.hi_freq = (self.hi_freq + best_freq) / 2.0 + delta;
                    }
                } else {
                    self.hi_freq = best_freq + self.num_variations as f64 * resolution;
                }
            } else {
                if self.hi_freq <= resolution {
                    return false;
                }
                let Some(failed_fmax) = self.state.failed_fmax else {
                    return false;
                };
                self.lo_freq = failed_fmax / (self.no_improvements as f64 * rng.gen::<f64>() + 1.0);
                self.hi_freq =
                    self.lo_freq + max_workers * resolution * rng.gen_range(0.75..1.0) + delta;
            }
        } else {
            self.no_improvements = 0;
            let best_freq = best_freq.expect("improved_idx set implies a best_freq");
            if self.last_best_freq > 0.0 {
                self.last_improvement = best_freq - self.last_best_freq;
            }
            self.last_best_freq = best_freq;

            if best_freq >= self.hi_freq {
                self.hi_freq = best_freq + resolution.max(self.freq_step) * max_workers;
            } else {
                self.hi_freq = (self.hi_freq + best_freq) / 2.0 + self.num_variations as f64 * resolution;
            }
        }

        true
    }

    /// `rand_choice(vlist_len, var)`: biases variation choice toward
    /// earlier (already-promoted) candidates as `var` grows across a
    /// batch's repeated sub-rounds.
    fn rand_choice(&self, vlist_len: usize, var: u32) -> usize {
        if self.num_variations <= 1 || vlist_len <= 1 {
            return 0;
        }
        let mut rng = rand::thread_rng();
        let choice_max = (((vlist_len - 1) as f64 * var as f64 + rng.gen::<f64>()) / self.num_variations as f64).round();
        let upper = (vlist_len - 1).min(choice_max.max(0.0) as usize);
        rng.gen_range(0..=upper)
    }

    fn deep_hash(settings: &Value) -> String {
        xeda_hash::fingerprint(settings).unwrap_or_default()
    }
}

impl Optimizer for FmaxOptimizer {
    fn next_batch(&mut self) -> Option<Vec<Value>> {
        if !self.update_bounds() {
            return None;
        }

        let mut n = self.state.max_workers;
        if self.num_variations > 1 {
            n = (n + self.num_variations as usize - 1) / self.num_variations as usize;
        }

        if self.hi_freq <= 0.0 || self.lo_freq < 0.0 {
            return None;
        }

        let base_settings = self.state.base_settings.clone();
        let mut max_var: u32 = 0;
        let mut batch_settings = Vec::new();
        self.variation_choices.clear();
        let mut rng = rand::thread_rng();

        loop {
            max_var += 1;
            if max_var > self.num_variations {
                self.lo_freq += rng.gen::<f64>() * self.settings.delta / 2.0;
                self.hi_freq += rng.gen_range(self.settings.delta..self.settings.resolution) / 2.0;
            }

            let (frequencies, freq_step) = linspace(self.lo_freq, self.hi_freq, n);
            self.freq_step = freq_step;

            for freq in &frequencies {
                let clock_period = (1000.0 / freq * 1000.0).round() / 1000.0;
                let mut choice_indices = HashMap::new();
                let mut variation_overrides = Map::new();
                for (key, candidates) in &self.variations {
                    if candidates.is_empty() {
                        continue;
                    }
                    let choice = self.rand_choice(candidates.len(), max_var);
                    choice_indices.insert(key.clone(), choice);
                    variation_overrides.insert(key.clone(), candidates[choice].clone());
                }

                let mut settings = match base_settings.as_object() {
                    Some(map) => map.clone(),
                    None => Map::new(),
                };
                settings.insert("clock_period".to_string(), json!(clock_period));
                for (k, v) in variation_overrides {
                    settings.insert(k, v);
                }
                let settings_value = Value::Object(settings);

                let hash = Self::deep_hash(&settings_value);
                if self.batch_hashes.insert(hash) {
                    self.variation_choices.push(choice_indices);
                    batch_settings.push(settings_value);
                    if batch_settings.len() >= self.state.max_workers {
                        self.state.improved_idx = None;
                        self.num_iterations += 1;
                        return Some(batch_settings);
                    }
                }
            }

            if max_var > self.num_variations * 4 {
                // Safety valve: the original relies on eventually drawing a
                // fresh, not-yet-hashed combination; cap the retries so a
                // saturated search space can't spin forever.
                break;
            }
        }

        self.state.improved_idx = None;
        self.num_iterations += 1;
        if batch_settings.is_empty() {
            None
        } else {
            Some(batch_settings)
        }
    }

    fn process_outcome(&mut self, outcome: &FlowOutcome, idx: usize) -> bool {
        let best_freq = self.best_freq();
        let fmax = Self::get_result_value(outcome);

        if let Some(fmax) = fmax {
            if !outcome.results.success {
                if best_freq.map_or(true, |b| fmax > b)
                    && self.state.failed_fmax.map_or(true, |f| fmax > f)
                {
                    self.state.failed_fmax = Some(fmax);
                }
                return false;
            }
        }

        let Some(fmax) = fmax else {
            return false;
        };

        if let Some(max_luts) = self.settings.max_luts {
            if let Some(lut) = outcome.result_value("lut").and_then(Value::as_u64) {
                if lut > max_luts {
                    return false;
                }
            }
        }

        if best_freq.map_or(true, |b| fmax > b) {
            self.state.best = Some(outcome.clone());
            self.state.base_settings = outcome.settings_snapshot.clone();
            self.state.improved_idx = Some(idx);
            if self.num_variations > 1 {
                if let Some(choices) = self.variation_choices.get(idx) {
                    for (key, &choice) in choices {
                        if let Some(candidates) = self.variations.get_mut(key) {
                            if choice > 0 && choice < candidates.len() {
                                let picked = candidates.remove(choice);
                                candidates.insert(0, picked);
                            }
                        }
                    }
                }
            }
            true
        } else {
            false
        }
    }

    fn best(&self) -> Option<&FlowOutcome> {
        self.state.best.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xeda_flow::FlowResults;

    fn outcome_with_fmax(fmax: f64, success: bool) -> FlowOutcome {
        let mut results = FlowResults::default();
        results.success = success;
        results.extra.insert("Fmax".into(), json!(fmax));
        FlowOutcome {
            settings_snapshot: json!({"clock_period": 1000.0 / fmax}),
            results,
            timestamp: None,
            run_path: None,
        }
    }

    #[test]
    fn linspace_degenerates_to_single_point_below_two_samples() {
        let (values, step) = linspace(10.0, 20.0, 1);
        assert_eq!(values, vec![20.0]);
        assert_eq!(step, 0.0);
    }

    #[test]
    fn linspace_spans_the_full_range() {
        let (values, step) = linspace(0.0, 10.0, 3);
        assert_eq!(values, vec![0.0, 5.0, 10.0]);
        assert_eq!(step, 5.0);
    }

    #[test]
    fn first_successful_outcome_becomes_best() {
        let settings = FmaxSettings::new(100.0, 400.0).unwrap();
        let mut optimizer = FmaxOptimizer::new(4, json!({}), settings);
        let improved = optimizer.process_outcome(&outcome_with_fmax(250.0, true), 0);
        assert!(improved);
        assert_eq!(optimizer.best_freq(), Some(250.0));
    }

    #[test]
    fn lower_fmax_does_not_displace_the_best() {
        let settings = FmaxSettings::new(100.0, 400.0).unwrap();
        let mut optimizer = FmaxOptimizer::new(4, json!({}), settings);
        optimizer.process_outcome(&outcome_with_fmax(300.0, true), 0);
        let improved = optimizer.process_outcome(&outcome_with_fmax(200.0, true), 1);
        assert!(!improved);
        assert_eq!(optimizer.best_freq(), Some(300.0));
    }

    #[test]
    fn failed_run_records_failed_fmax_but_is_never_best() {
        let settings = FmaxSettings::new(100.0, 400.0).unwrap();
        let mut optimizer = FmaxOptimizer::new(4, json!({}), settings);
        let improved = optimizer.process_outcome(&outcome_with_fmax(320.0, false), 0);
        assert!(!improved);
        assert_eq!(optimizer.best_freq(), None);
        assert_eq!(optimizer.state.failed_fmax, Some(320.0));
    }

    #[test]
    fn invalid_frequency_window_is_rejected() {
        let err = FmaxSettings::new(400.0, 100.0).unwrap_err();
        assert!(matches!(
            err,
            crate::error::DseError::InvalidFrequencyWindow { .. }
        ));
    }

    #[test]
    fn next_batch_yields_frequencies_within_the_initial_window() {
        let settings = FmaxSettings::new(100.0, 400.0).unwrap();
        let mut optimizer = FmaxOptimizer::new(2, json!({}), settings);
        let batch = optimizer.next_batch().expect("first batch always runs");
        assert!(!batch.is_empty());
        for settings in &batch {
            let period = settings["clock_period"].as_f64().unwrap();
            let freq = 1000.0 / period;
            assert!((100.0..=400.0).contains(&freq));
        }
    }
}
