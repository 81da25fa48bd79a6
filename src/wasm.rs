//! WebAssembly bindings for the viewer core.
//!
//! Provides a thin wrapper around `ViewerSession` for browser environments.
//! Dataset fetching is a free function so an outstanding fetch never holds a
//! borrow of the viewer; the page drives it like this:
//!
//! ```text
//! const generation = viewer.beginLoad(name);
//! try {
//!     const text = await fetchDataset(name);
//!     viewer.finishLoad(generation, name, text);
//! } catch (e) {
//!     viewer.failLoad(generation, name, String(e));
//! }
//! ```

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestCache, RequestInit, Response};

use crate::{
    loader::{DatasetRef, FetchError},
    schema::{CrossSectionMode, ViewerConfig},
    session::{LoadOutcome, LoadTicket, ViewerSession},
};

/// Initialize WASM module with panic hook and logging.
#[wasm_bindgen(start)]
pub fn init() {
    // Set panic hook for better error messages in browser
    console_error_panic_hook::set_once();

    // Initialize WASM logger
    wasm_logger::init(wasm_logger::Config::default());
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn dataset_ref(name: &str) -> Result<DatasetRef, JsValue> {
    DatasetRef::new(name).map_err(js_error)
}

/// Fetch dataset text by name, bypassing the browser cache.
#[wasm_bindgen(js_name = fetchDataset)]
pub async fn fetch_dataset(name: String) -> Result<String, JsValue> {
    let dataset = dataset_ref(&name)?;
    let io_error = |e: JsValue| {
        js_error(FetchError::Io {
            name: name.clone(),
            message: e.as_string().unwrap_or_else(|| format!("{e:?}")),
        })
    };

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window available"))?;

    let opts = RequestInit::new();
    opts.set_method("GET");
    opts.set_cache(RequestCache::NoCache);

    let url = format!("{}?v={}", dataset.name(), js_sys::Date::now() as u64);
    let request = Request::new_with_str_and_init(&url, &opts).map_err(io_error)?;
    let headers = request.headers();
    headers.set("Cache-Control", "no-cache").map_err(io_error)?;
    headers.set("Pragma", "no-cache").map_err(io_error)?;

    let response: Response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(io_error)?
        .dyn_into()
        .map_err(io_error)?;

    if !response.ok() {
        return Err(js_error(FetchError::Status {
            name: name.clone(),
            status: response.status(),
        }));
    }

    let text = JsFuture::from(response.text().map_err(io_error)?)
        .await
        .map_err(io_error)?;
    text.as_string()
        .ok_or_else(|| JsValue::from_str("Response body is not text"))
}

/// WebAssembly wrapper for a viewer session.
#[wasm_bindgen]
pub struct WasmViewer {
    session: ViewerSession,
}

impl WasmViewer {
    /// Ticket registered by `beginLoad`; `name` only labels a superseded load.
    fn ticket(&self, generation: u64, name: &str) -> Result<LoadTicket, JsValue> {
        match self.session.pending_ticket(generation) {
            Some(ticket) => Ok(ticket),
            None => Ok(LoadTicket {
                generation,
                dataset: dataset_ref(name)?,
            }),
        }
    }
}

#[wasm_bindgen]
impl WasmViewer {
    /// Create a viewer from JSON configuration (empty string for defaults).
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmViewer, JsValue> {
        let config: ViewerConfig = if config_json.trim().is_empty() {
            ViewerConfig::default()
        } else {
            serde_json::from_str(config_json)
                .map_err(|e| JsValue::from_str(&format!("Invalid config JSON: {e}")))?
        };
        let session = ViewerSession::new(config).map_err(js_error)?;
        Ok(WasmViewer { session })
    }

    /// Dataset named by the page's query string, or the configured default.
    #[wasm_bindgen(js_name = initialDataset)]
    pub fn initial_dataset(&self, query: &str) -> Result<String, JsValue> {
        self.session
            .initial_dataset(query)
            .map(|d| d.name().to_string())
            .map_err(js_error)
    }

    /// Register a new load; returns its generation.
    #[wasm_bindgen(js_name = beginLoad)]
    pub fn begin_load(&mut self, name: &str) -> Result<u64, JsValue> {
        Ok(self.session.begin_load(dataset_ref(name)?).generation)
    }

    /// Complete a load. Returns false when the load was superseded.
    #[wasm_bindgen(js_name = finishLoad)]
    pub fn finish_load(&mut self, generation: u64, name: &str, text: String) -> Result<bool, JsValue> {
        let ticket = self.ticket(generation, name)?;
        match self.session.finish_load(&ticket, Ok(text)).map_err(js_error)? {
            LoadOutcome::Loaded(_) => Ok(true),
            LoadOutcome::Stale => Ok(false),
        }
    }

    /// Report a failed fetch. Errors unless the load was superseded.
    #[wasm_bindgen(js_name = failLoad)]
    pub fn fail_load(&mut self, generation: u64, name: &str, message: String) -> Result<bool, JsValue> {
        let ticket = self.ticket(generation, name)?;
        match self
            .session
            .finish_load(&ticket, Err(FetchError::Other(message)))
            .map_err(js_error)?
        {
            LoadOutcome::Loaded(_) => Ok(true),
            LoadOutcome::Stale => Ok(false),
        }
    }

    /// Load dataset text directly.
    #[wasm_bindgen(js_name = loadText)]
    pub fn load_text(&mut self, name: &str, text: &str) -> Result<(), JsValue> {
        self.session
            .load_text(dataset_ref(name)?, text)
            .map(|_| ())
            .map_err(js_error)
    }

    /// Host animation tick. Returns true when the frame changed.
    #[wasm_bindgen]
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.session.tick(now_ms)
    }

    #[wasm_bindgen]
    pub fn play(&mut self) {
        self.session.play();
    }

    #[wasm_bindgen]
    pub fn pause(&mut self) {
        self.session.pause();
    }

    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.session.reset();
    }

    #[wasm_bindgen]
    pub fn seek(&mut self, frame: usize) -> Result<(), JsValue> {
        self.session.seek(frame).map_err(js_error)
    }

    /// Set speed multiplier; returns the clamped speed applied.
    #[wasm_bindgen(js_name = setSpeed)]
    pub fn set_speed(&mut self, speed: f64) -> Result<f64, JsValue> {
        self.session.set_speed(speed).map_err(js_error)
    }

    /// Set cross-section mode by name ("full", "horizontal", "vertical").
    #[wasm_bindgen(js_name = setCrossSection)]
    pub fn set_cross_section(&mut self, mode: &str) -> Result<(), JsValue> {
        let mode = CrossSectionMode::from_name(mode)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown cross-section mode: {mode}")))?;
        self.session.set_cross_section(mode);
        Ok(())
    }

    #[wasm_bindgen(js_name = toggleCategory)]
    pub fn toggle_category(&mut self, id: u32) -> Result<bool, JsValue> {
        self.session.toggle_category(id).map_err(js_error)
    }

    #[wasm_bindgen(js_name = toggleColorByType)]
    pub fn toggle_color_by_type(&mut self) -> bool {
        self.session.toggle_color_by_type()
    }

    #[wasm_bindgen(js_name = getCurrentFrame)]
    pub fn get_current_frame(&self) -> usize {
        self.session.current_frame()
    }

    /// Visible points as flat `[x, y, z, ...]`.
    #[wasm_bindgen(js_name = visiblePositions)]
    pub fn visible_positions(&self) -> Vec<f32> {
        self.session
            .visible_points()
            .iter()
            .flat_map(|p| p.position)
            .collect()
    }

    /// Visible point colors as flat normalized `[r, g, b, ...]`.
    #[wasm_bindgen(js_name = visibleColors)]
    pub fn visible_colors(&self) -> Vec<f32> {
        self.session
            .visible_points()
            .iter()
            .flat_map(|p| p.color_rgb())
            .collect()
    }

    /// Visible points as an array of objects.
    #[wasm_bindgen(js_name = getVisiblePoints)]
    pub fn get_visible_points(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.session.visible_points())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
    }

    #[wasm_bindgen(js_name = getLegend)]
    pub fn get_legend(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.session.legend())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
    }

    #[wasm_bindgen(js_name = getViewState)]
    pub fn get_view_state(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.session.view_state())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
    }

    #[wasm_bindgen(js_name = getSummary)]
    pub fn get_summary(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.session.summary())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
    }

    /// `dataset=<name>` for the page URL, if a dataset is loaded.
    #[wasm_bindgen(js_name = locationQuery)]
    pub fn location_query(&self) -> Option<String> {
        self.session.location_query()
    }
}
