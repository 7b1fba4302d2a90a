#![forbid(unsafe_code)]

//! `wasm-bindgen` exports for the PresenceRunner.
//!
//! This module wraps [`super::runner_core::RunnerCore`] with JS-friendly types.
//! Only compiled on `wasm32` targets.
//!
//! The CRDT engine and the editor stay on the JS side and are reached through
//! callbacks:
//!
//! - `resolve(token) -> {container, offset} | null`
//! - `documentLength() -> number`
//! - `coordsAt(offset) -> {left, top} | null`
//! - `onHover(elementId, entered)`

use std::rc::Rc;

use js_sys::{Function, Reflect};
use nbp_core::{
    AbsolutePosition, ClientId, ContainerId, EditorLayout, Point, PositionResolver,
    RelativePosition,
};
use nbp_runtime::{DirtyReasons, PresenceConfig};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Element;

use super::dom::DomHost;
use super::runner_core::RunnerCore;

fn console_error(msg: &str) {
    let global = js_sys::global();
    let Ok(console) = Reflect::get(&global, &"console".into()) else {
        return;
    };
    let Ok(error) = Reflect::get(&console, &"error".into()) else {
        return;
    };
    let Ok(error_fn) = error.dyn_into::<Function>() else {
        return;
    };
    let _ = error_fn.call1(&console, &JsValue::from_str(msg));
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = if let Some(loc) = info.location() {
                format!(
                    "panic at {}:{}:{}: {info}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                )
            } else {
                format!("panic: {info}")
            };
            console_error(&msg);
        }));
    });
}

fn get_f64(obj: &JsValue, key: &str) -> Option<f64> {
    Reflect::get(obj, &JsValue::from_str(key)).ok()?.as_f64()
}

fn non_negative_usize(value: f64) -> Option<usize> {
    (value.is_finite() && value >= 0.0).then(|| value.min(usize::MAX as f64) as usize)
}

/// Position resolution through a JS callback.
struct JsResolver {
    resolve: Function,
}

impl PositionResolver for JsResolver {
    fn resolve(&self, position: &RelativePosition) -> Option<AbsolutePosition> {
        let result = self
            .resolve
            .call1(&JsValue::NULL, &JsValue::from_str(position.token()))
            .ok()?;
        if result.is_null() || result.is_undefined() {
            return None;
        }
        let container = Reflect::get(&result, &JsValue::from_str("container"))
            .ok()?
            .as_string()?;
        let offset = non_negative_usize(get_f64(&result, "offset")?)?;
        Some(AbsolutePosition::new(container, offset))
    }
}

/// Editor layout through JS callbacks.
struct JsEditor {
    container: ContainerId,
    document_length: Function,
    coords_at: Function,
}

impl EditorLayout for JsEditor {
    fn container(&self) -> &ContainerId {
        &self.container
    }

    fn document_length(&self) -> usize {
        self.document_length
            .call0(&JsValue::NULL)
            .ok()
            .and_then(|v| v.as_f64())
            .and_then(non_negative_usize)
            .unwrap_or(0)
    }

    fn coords_at(&self, offset: usize) -> Option<Point> {
        let result = self
            .coords_at
            .call1(&JsValue::NULL, &JsValue::from_f64(offset as f64))
            .ok()?;
        if result.is_null() || result.is_undefined() {
            return None;
        }
        Some(Point::new(get_f64(&result, "left")?, get_f64(&result, "top")?))
    }
}

/// Presence overlays for one notebook panel.
///
/// Host-driven: JavaScript forwards awareness states and editor events, calls
/// `animationFrame` from `requestAnimationFrame`, and calls `advanceTime`
/// when `nextWakeupMs` is reached.
#[wasm_bindgen]
pub struct PresenceRunner {
    inner: RunnerCore<DomHost>,
    host: Rc<DomHost>,
}

#[wasm_bindgen(start)]
pub fn wasm_start() {
    install_panic_hook();
}

#[wasm_bindgen]
impl PresenceRunner {
    /// Create a runner. `config_json` optionally overrides the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(
        local_client: f64,
        resolve: Function,
        on_hover: Function,
        config_json: Option<String>,
    ) -> Result<PresenceRunner, JsValue> {
        install_panic_hook();
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let config = match config_json {
            Some(json) => PresenceConfig::from_json_str(&json)
                .map_err(|err| JsValue::from_str(&err.to_string()))?,
            None => PresenceConfig::default(),
        };
        let local = non_negative_usize(local_client)
            .ok_or_else(|| JsValue::from_str("invalid local client id"))?;
        let host = Rc::new(DomHost::new(document, on_hover));
        let inner = RunnerCore::new(
            Rc::clone(&host),
            ClientId::new(local as u64),
            Rc::new(JsResolver { resolve }),
            config,
        );
        Ok(Self { inner, host })
    }

    /// Element that hosts the roster avatars (or `null` when the panel has
    /// no toolbar).
    #[wasm_bindgen(js_name = setToolbar)]
    pub fn set_toolbar(&mut self, toolbar: Option<Element>) -> bool {
        self.host.set_toolbar(toolbar);
        self.inner.notify_layout()
    }

    #[wasm_bindgen(js_name = setCellElement)]
    pub fn set_cell_element(&mut self, cell: String, element: Element) {
        self.host.set_cell_element(ContainerId::new(cell), element);
    }

    #[wasm_bindgen(js_name = removeCellElement)]
    pub fn remove_cell_element(&mut self, cell: String) {
        self.host.remove_cell_element(&ContainerId::new(cell));
    }

    /// Current cell ids, in notebook order.
    #[wasm_bindgen(js_name = setCells)]
    pub fn set_cells(&mut self, cells: Vec<String>) -> bool {
        self.inner.set_cells(cells)
    }

    /// Forward `awareness.getStates()` as JSON. Returns whether a frame is
    /// pending; malformed payloads throw.
    #[wasm_bindgen(js_name = pushAwareness)]
    pub fn push_awareness(&mut self, json: &str) -> Result<bool, JsValue> {
        self.inner
            .push_awareness_json(json)
            .map_err(|err| JsValue::from_str(&err.to_string()))
    }

    #[wasm_bindgen(js_name = attachEditor)]
    pub fn attach_editor(
        &mut self,
        container: String,
        document_length: Function,
        coords_at: Function,
    ) -> Result<u32, JsValue> {
        let editor = JsEditor {
            container: ContainerId::new(container),
            document_length,
            coords_at,
        };
        self.inner
            .attach_editor(Rc::new(editor))
            .map(|id| id.0)
            .map_err(|err| JsValue::from_str(&err.to_string()))
    }

    #[wasm_bindgen(js_name = detachEditor)]
    pub fn detach_editor(&mut self, container: &str) -> bool {
        self.inner.detach_editor(container)
    }

    /// `reasons` is a bit set: 1 awareness, 2 document, 4 selection,
    /// 8 viewport, 16 cells, 32 forced.
    #[wasm_bindgen(js_name = notifyEditor)]
    pub fn notify_editor(&mut self, container: &str, reasons: u8) -> bool {
        self.inner
            .notify_editor(container, DirtyReasons::from_bits_truncate(reasons))
    }

    #[wasm_bindgen(js_name = notifyLayout)]
    pub fn notify_layout(&mut self) -> bool {
        self.inner.notify_layout()
    }

    /// Run pending passes. Returns the number of widgets that reconciled.
    #[wasm_bindgen(js_name = animationFrame)]
    pub fn animation_frame(&mut self, now_ms: f64) -> u32 {
        let passes = self.inner.animation_frame(now_ms).len();
        u32::try_from(passes).unwrap_or(u32::MAX)
    }

    #[wasm_bindgen(js_name = isFramePending)]
    pub fn is_frame_pending(&self) -> bool {
        self.inner.is_frame_pending()
    }

    #[wasm_bindgen(js_name = advanceTime)]
    pub fn advance_time(&mut self, now_ms: f64) -> bool {
        self.inner.advance_time(now_ms)
    }

    pub fn pointer(&mut self, element: f64, entered: bool, now_ms: f64) -> bool {
        let Some(id) = non_negative_usize(element) else {
            return false;
        };
        self.inner.pointer(id as u64, entered, now_ms)
    }

    #[wasm_bindgen(js_name = nextWakeupMs)]
    pub fn next_wakeup_ms(&self) -> Option<f64> {
        self.inner.next_wakeup_ms()
    }

    #[wasm_bindgen(js_name = liveElements)]
    pub fn live_elements(&self) -> u32 {
        u32::try_from(self.host.live_count()).unwrap_or(u32::MAX)
    }

    /// Remove every overlay, timer, and listener. Safe to call twice.
    pub fn dispose(&mut self) {
        self.inner.dispose();
    }
}
