use serde::{Deserialize, Serialize};

/// Main-zone power state. The device speaks "on"/"standby"; the facade
/// accepts "on"/"off".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Power {
    On,
    Standby,
}

impl Power {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Standby => "standby",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "on" => Some(Self::On),
            "standby" => Some(Self::Standby),
            _ => None,
        }
    }
}

/// Mute commands accepted by the device. State reports are plain on/off.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MuteCommand {
    On,
    Off,
    Toggle,
}

impl MuteCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Toggle => "toggle",
        }
    }
}

/// Relative selector movement; the device calls these "up" and "down".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectorStep {
    Next,
    Previous,
}

impl SelectorStep {
    pub fn device_id(&self) -> &'static str {
        match self {
            Self::Next => "up",
            Self::Previous => "down",
        }
    }
}

/// Logical input selectors. The device reports its own short identifiers
/// (e.g. HDMI 1 is "dvd" on this hardware); [`Input::device_id`] and
/// [`Input::from_device_id`] are the bidirectional table between the two.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Input {
    #[serde(rename = "hdmi-1")]
    Hdmi1,
    #[serde(rename = "hdmi-2")]
    Hdmi2,
    #[serde(rename = "hdmi-3")]
    Hdmi3,
    #[serde(rename = "hdmi-4")]
    Hdmi4,
    #[serde(rename = "hdmi-5")]
    Hdmi5,
    #[serde(rename = "hdmi-6")]
    Hdmi6,
    #[serde(rename = "hdmi-7")]
    Hdmi7,
    Phono,
    Am,
    Fm,
    Network,
    Usb,
    Bluetooth,
}

impl Input {
    pub const ALL: &'static [Input] = &[
        Self::Hdmi1,
        Self::Hdmi2,
        Self::Hdmi3,
        Self::Hdmi4,
        Self::Hdmi5,
        Self::Hdmi6,
        Self::Hdmi7,
        Self::Phono,
        Self::Am,
        Self::Fm,
        Self::Network,
        Self::Usb,
        Self::Bluetooth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hdmi1 => "hdmi-1",
            Self::Hdmi2 => "hdmi-2",
            Self::Hdmi3 => "hdmi-3",
            Self::Hdmi4 => "hdmi-4",
            Self::Hdmi5 => "hdmi-5",
            Self::Hdmi6 => "hdmi-6",
            Self::Hdmi7 => "hdmi-7",
            Self::Phono => "phono",
            Self::Am => "am",
            Self::Fm => "fm",
            Self::Network => "network",
            Self::Usb => "usb",
            Self::Bluetooth => "bluetooth",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|i| i.as_str() == s)
    }

    /// The identifier the device uses for this input on the wire.
    pub fn device_id(&self) -> &'static str {
        match self {
            Self::Hdmi1 => "dvd",
            Self::Hdmi2 => "video2",
            Self::Hdmi3 => "video3",
            Self::Hdmi4 => "strm-box",
            Self::Hdmi5 => "hdmi-5",
            Self::Hdmi6 => "hdmi-6",
            Self::Hdmi7 => "video4",
            Self::Phono => "phono",
            Self::Am => "am",
            Self::Fm => "fm",
            Self::Network => "network",
            Self::Usb => "usb",
            Self::Bluetooth => "bluetooth",
        }
    }

    pub fn from_device_id(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|i| i.device_id() == s)
    }
}

/// Listening modes this hardware understands. Reported and commanded by
/// logical name; no separate device identifier table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListeningMode {
    PureAudio,
    DolbyAtmos,
    #[serde(rename = "neo-6-cinema")]
    Neo6Cinema,
    NeoXCinema,
    DtsX,
    NeuralX,
    Stereo,
    Direct,
    TheaterDimensional,
    Mono,
    WholeHouse,
    Sports,
    AutoSurround,
    Auto,
    Surr,
    Ster,
}

impl ListeningMode {
    pub const ALL: &'static [ListeningMode] = &[
        Self::PureAudio,
        Self::DolbyAtmos,
        Self::Neo6Cinema,
        Self::NeoXCinema,
        Self::DtsX,
        Self::NeuralX,
        Self::Stereo,
        Self::Direct,
        Self::TheaterDimensional,
        Self::Mono,
        Self::WholeHouse,
        Self::Sports,
        Self::AutoSurround,
        Self::Auto,
        Self::Surr,
        Self::Ster,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PureAudio => "pure-audio",
            Self::DolbyAtmos => "dolby-atmos",
            Self::Neo6Cinema => "neo-6-cinema",
            Self::NeoXCinema => "neo-x-cinema",
            Self::DtsX => "dts-x",
            Self::NeuralX => "neural-x",
            Self::Stereo => "stereo",
            Self::Direct => "direct",
            Self::TheaterDimensional => "theater-dimensional",
            Self::Mono => "mono",
            Self::WholeHouse => "whole-house",
            Self::Sports => "sports",
            Self::AutoSurround => "auto-surround",
            Self::Auto => "auto",
            Self::Surr => "surr",
            Self::Ster => "ster",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.as_str() == s)
    }
}

/// Brightness of the front-panel display and LEDs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DimmerLevel {
    Bright,
    Dim,
    Dark,
    ShutOff,
    BrightLedOff,
}

impl DimmerLevel {
    pub const ALL: &'static [DimmerLevel] = &[
        Self::Bright,
        Self::Dim,
        Self::Dark,
        Self::ShutOff,
        Self::BrightLedOff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bright => "bright",
            Self::Dim => "dim",
            Self::Dark => "dark",
            Self::ShutOff => "shut-off",
            Self::BrightLedOff => "bright-led-off",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.as_str() == s)
    }
}
