//! Typed setting keys
//!
//! Settings live in three independent scopes:
//!
//! - **client**: global to this installation (theme, hotkeys)
//! - **local document**: this client and one document (which backend to
//!   use and its credentials); never stored in the document's own backend
//! - **document**: stored with the document (enabled plugins)
//!
//! Each setting is a unit type implementing [`Setting`] plus exactly one
//! scope trait. The set is sealed, so each scope is a closed enumeration:
//! asking a store for a setting of the wrong scope, or using the wrong
//! value type, fails to compile, and every setting carries its own default.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::{BackendType, HotkeySettings};

mod sealed {
    pub trait Sealed {}
}

/// A named setting with a typed value and a default
pub trait Setting: sealed::Sealed {
    type Value: Serialize + DeserializeOwned;

    /// Name used in the persisted key
    const NAME: &'static str;

    fn default_value() -> Self::Value;
}

/// Settings global to the client
pub trait ClientSetting: Setting {}

/// Settings local to this client and one document
pub trait LocalDocSetting: Setting {}

/// Settings stored with the document
pub trait DocSetting: Setting {}

macro_rules! settings {
    (
        $scope:ident, $names:ident;
        $( $(#[$meta:meta])* $setting:ident => $name:literal: $value:ty = $default:expr; )*
    ) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct $setting;

            impl sealed::Sealed for $setting {}

            impl Setting for $setting {
                type Value = $value;
                const NAME: &'static str = $name;

                fn default_value() -> $value {
                    $default
                }
            }

            impl $scope for $setting {}
        )*

        /// Names of every setting in this scope
        pub const $names: &[&str] = &[$($name),*];
    };
}

settings! {
    ClientSetting, CLIENT_SETTINGS;
    /// UI theme identifier
    Theme => "theme": String = "default-theme".to_string();
    /// Whether the key binding help panel is shown
    ShowKeyBindings => "showKeyBindings": bool = true;
    /// User hotkey overrides
    Hotkeys => "hotkeys": HotkeySettings = HotkeySettings::new();
}

settings! {
    LocalDocSetting, LOCAL_DOC_SETTINGS;
    /// Backend the document is stored in
    DataSource => "dataSource": BackendType = BackendType::Local;
    FirebaseId => "firebaseId": Option<String> = None;
    FirebaseApiKey => "firebaseApiKey": Option<String> = None;
    FirebaseUserEmail => "firebaseUserEmail": Option<String> = None;
    FirebaseUserPassword => "firebaseUserPassword": Option<String> = None;
    /// Host of the socket server backend
    SocketServerHost => "socketServerHost": Option<String> = None;
    SocketServerPassword => "socketServerPassword": Option<String> = None;
}

settings! {
    DocSetting, DOC_SETTINGS;
    /// Plugins turned on for the document
    EnabledPlugins => "enabledPlugins": Vec<String> = DEFAULT_PLUGINS
        .iter()
        .map(|p| p.to_string())
        .collect();
}

/// Plugins enabled in a document that never chose its own
pub const DEFAULT_PLUGINS: &[&str] = &["Marks", "HTML", "LaTeX", "Text Formatting", "Todo"];
