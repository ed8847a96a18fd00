//! Browser host
//!
//! Wraps the native `MutationObserver`. The JS callback owns a clone of the
//! adapter callback; disconnecting drops the observer and its closure.

use crate::domain::NormalizedOptions;
use crate::error::ObserveError;
use crate::ports::{MutationCallback, MutationSource, ObserverHandle};
use js_sys::Array;
use tracing::debug;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{MutationObserver, MutationObserverInit, MutationRecord, Node};

/// The page's `MutationObserver`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebMutationSource;

impl WebMutationSource {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn observer_init(options: &NormalizedOptions) -> MutationObserverInit {
    let init = MutationObserverInit::new();
    init.set_child_list(options.child_list);
    init.set_attributes(options.attributes);
    init.set_character_data(options.character_data);
    init.set_subtree(options.subtree);
    if options.attribute_old_value {
        init.set_attribute_old_value(true);
    }
    if options.character_data_old_value {
        init.set_character_data_old_value(true);
    }
    if let Some(filter) = &options.attribute_filter {
        let names: Array = filter.iter().map(|name| JsValue::from_str(name)).collect();
        init.set_attribute_filter(&names);
    }
    init
}

fn host_error(err: JsValue) -> ObserveError {
    ObserveError::Host(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

impl MutationSource for WebMutationSource {
    type Target = Node;
    type Record = MutationRecord;
    type Observer = WebObserver;

    fn observe(
        &self,
        target: &Node,
        options: &NormalizedOptions,
        callback: MutationCallback<MutationRecord>,
    ) -> Result<WebObserver, ObserveError> {
        let closure = Closure::<dyn FnMut(Array, MutationObserver)>::new(
            move |records: Array, _observer: MutationObserver| {
                let batch = records
                    .iter()
                    .map(|record| record.unchecked_into::<MutationRecord>())
                    .collect();
                callback.call(batch);
            },
        );

        let observer =
            MutationObserver::new(closure.as_ref().unchecked_ref()).map_err(host_error)?;
        observer
            .observe_with_options(target, &observer_init(options))
            .map_err(host_error)?;

        debug!(node = %target.node_name(), "Browser observer registered");
        Ok(WebObserver {
            observer,
            _closure: closure,
        })
    }
}

/// A connected browser `MutationObserver`.
pub struct WebObserver {
    observer: MutationObserver,
    // Must outlive the observer's last possible invocation.
    _closure: Closure<dyn FnMut(Array, MutationObserver)>,
}

impl ObserverHandle for WebObserver {
    fn disconnect(&mut self) {
        self.observer.disconnect();
        // Drop anything the browser queued but has not delivered yet.
        let _ = self.observer.take_records();
    }
}
