// src/python.rs
//
// Python bindings, built with `--features python`. Exposes the environment
// with the gym-style surface a Python training loop expects.

use std::path::PathBuf;

use pyo3::exceptions::{PyLookupError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::config::EnvConfig;
use crate::env::{AddEnv, Env, EnvError};
use crate::tokenizer::{TokenId, Tokenizer, TokenizerError, VocabTokenizer};

fn to_py_err(err: EnvError) -> PyErr {
    match err {
        EnvError::Tokenizer(TokenizerError::MissingControlToken(_)) => {
            PyLookupError::new_err(err.to_string())
        }
        EnvError::EpisodeFinished { .. } => PyRuntimeError::new_err(err.to_string()),
        _ => PyValueError::new_err(err.to_string()),
    }
}

/// The arithmetic scratchpad environment.
#[pyclass(name = "AddEnv")]
struct PyAddEnv {
    inner: AddEnv<VocabTokenizer>,
}

#[pymethods]
impl PyAddEnv {
    #[new]
    #[pyo3(signature = (tokenizer_path=None, max_val=10, max_token_length=35, padding=true, seed=None))]
    fn new(
        tokenizer_path: Option<PathBuf>,
        max_val: i64,
        max_token_length: usize,
        padding: bool,
        seed: Option<u64>,
    ) -> PyResult<Self> {
        let config = EnvConfig {
            tokenizer_path,
            max_val,
            max_token_length,
            padding,
            seed,
            ..EnvConfig::default()
        };
        let inner = AddEnv::from_config(config).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    fn reset(&mut self) -> PyResult<Vec<TokenId>> {
        self.inner.reset().map_err(to_py_err)
    }

    /// Returns `(observation, reward, done, info)`.
    fn step<'py>(
        &mut self,
        py: Python<'py>,
        action: TokenId,
    ) -> PyResult<(Vec<TokenId>, i32, bool, Bound<'py, PyDict>)> {
        let (obs, _, done, _) = self.inner.step(action).map_err(to_py_err)?;
        let reward = self.inner.outcome().as_i32();
        Ok((obs, reward, done, PyDict::new(py)))
    }

    fn render(&self) -> PyResult<()> {
        self.inner.render().map_err(to_py_err)
    }

    fn seed(&mut self, seed: u64) {
        self.inner.seed(seed);
    }

    /// Gold trajectory and its masks for the current episode.
    fn get_gold<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let gold = self.inner.gold_trajectory();
        let dict = PyDict::new(py);
        dict.set_item("gold_state", gold.gold_sequence)?;
        dict.set_item("trainable_tokens_mask", gold.trainable_mask)?;
        dict.set_item("auto_generated_mask", gold.auto_generated)?;
        dict.set_item("parity_mask", gold.parity_mask)?;
        dict.set_item("prefix_mask", gold.prefix_mask)?;
        Ok(dict)
    }

    #[pyo3(signature = (ids, keep_control_tokens=true))]
    fn decode(&self, ids: Vec<TokenId>, keep_control_tokens: bool) -> String {
        self.inner.tokenizer().decode(&ids, keep_control_tokens)
    }

    fn text(&self) -> String {
        self.inner.text()
    }

    #[getter]
    fn operands(&self) -> (i64, i64) {
        self.inner.episode().operands()
    }

    #[getter]
    fn vocab_size(&self) -> usize {
        self.inner.tokenizer().vocab_size()
    }

    #[getter]
    fn max_token_length(&self) -> usize {
        self.inner.config().max_token_length
    }
}

/// Runs scratchpad code and returns `(text, is_error)`.
#[pyfunction]
fn execute(code: &str) -> (String, bool) {
    let result = crate::interpreter::execute(code);
    (result.text, result.is_error)
}

/// Entry point of the `addgym` extension module; its name matches `lib.name`.
#[pymodule]
fn addgym(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyAddEnv>()?;
    m.add_function(wrap_pyfunction!(execute, m)?)?;
    Ok(())
}
