use serde::Serialize;

use crate::client::WledError;

/// Effect table as the controller firmware orders it. Lookup takes the first
/// occurrence; the wire index is the table position plus one.
pub const EFFECTS: &[&str] = &[
    "Solid",
    "Blink",
    "Breathe",
    "Wipe",
    "Wipe Random",
    "Random Colors",
    "Sweep",
    "Dynamic",
    "Colorloop",
    "Rainbow",
    "Scan",
    "Dual Scan",
    "Fade",
    "Chase",
    "Chase Rainbow",
    "Running",
    "Saw",
    "Twinkle",
    "Dissolve",
    "Dissolve Rnd",
    "Sparkle",
    "Sparkle+",
    "Strobe",
    "Strobe Rainbow",
    "Mega Strobe",
    "Blink Rainbow",
    "Android",
    "Chase",
    "Chase Random",
    "Chase Rainbow",
    "Chase Flash",
    "Chase Flash Rnd",
    "Rainbow Runner",
    "Colorful",
    "Traffic Light",
    "Sweep Random",
    "Running 2",
    "Red & Blue",
    "Stream",
    "Scanner",
    "Lighthouse",
    "Fireworks",
    "Rain",
    "Merry Christmas",
    "Fire Flicker",
    "Gradient",
    "Loading",
    "In Out",
    "In In",
    "Out Out",
    "Out In",
    "Circus",
    "Halloween",
    "Tri Chase",
    "Tri Wipe",
    "Tri Fade",
    "Lightning",
    "ICU",
    "Multi Comet",
    "Dual Scanner",
    "Stream 2",
    "Oscillate",
    "Pride 2015",
    "Juggle",
    "Palette",
    "Fire 2012",
    "Colorwaves",
    "BPM",
    "Fill Noise",
    "Noise 1",
    "Noise 2",
    "Noise 3",
    "Noise 4",
    "Colortwinkle",
    "Lake",
    "Meteor",
    "Smooth Meteor",
    "Railway",
    "Ripple",
];

/// One-based wire index of a named effect.
pub fn effect_index(name: &str) -> Option<usize> {
    EFFECTS.iter().position(|e| *e == name).map(|i| i + 1)
}

/// Map a 0–100 percentage onto the controller's 0–255 byte scale.
fn regulate(percent: f64) -> u8 {
    (percent * 2.55).clamp(0.0, 255.0).round() as u8
}

/// One LED segment of a state update. All fields except the range are
/// optional; absent fields are omitted from the packet and leave the
/// controller's current value untouched.
#[derive(Clone, Debug, Serialize)]
pub struct Segment {
    start: u16,
    stop: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    col: Option<[[u8; 3]; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fx: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sx: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ix: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    on: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bri: Option<u8>,
}

impl Segment {
    pub fn new(start: u16, stop: u16) -> Self {
        Self {
            start,
            stop,
            col: None,
            fx: None,
            sx: None,
            ix: None,
            on: None,
            bri: None,
        }
    }

    pub fn effect(mut self, name: &str) -> Result<Self, WledError> {
        self.fx = Some(effect_index(name).ok_or_else(|| WledError::UnknownEffect(name.to_owned()))?);
        Ok(self)
    }

    pub fn effect_speed(mut self, percent: f64) -> Self {
        self.sx = Some(regulate(percent));
        self
    }

    pub fn effect_intensity(mut self, percent: f64) -> Self {
        self.ix = Some(regulate(percent));
        self
    }

    pub fn power(mut self, on: bool) -> Self {
        self.on = Some(on);
        self
    }

    pub fn brightness(mut self, percent: f64) -> Self {
        self.bri = Some(regulate(percent));
        self
    }

    /// Three-color palette, each channel on the 0–100 scale.
    pub fn palette(mut self, colors: [[f64; 3]; 3]) -> Self {
        self.col = Some(colors.map(|c| c.map(regulate)));
        self
    }
}

/// A `/json/state` update packet. Top-level fields apply device-wide;
/// segments apply per LED range.
#[derive(Clone, Debug, Default, Serialize)]
pub struct StateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    on: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bri: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transition: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    seg: Vec<Segment>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn power(mut self, on: bool) -> Self {
        self.on = Some(on);
        self
    }

    pub fn brightness(mut self, percent: f64) -> Self {
        self.bri = Some(regulate(percent));
        self
    }

    pub fn transition(mut self, ms: u32) -> Self {
        self.transition = Some(ms);
        self
    }

    pub fn segment(mut self, segment: Segment) -> Self {
        self.seg.push(segment);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn regulation_scales_and_clamps() {
        assert_eq!(regulate(0.0), 0);
        assert_eq!(regulate(100.0), 255);
        assert_eq!(regulate(50.0), 128);
        assert_eq!(regulate(200.0), 255);
        assert_eq!(regulate(-5.0), 0);
    }

    #[test]
    fn effect_index_is_one_based_first_occurrence() {
        assert_eq!(effect_index("Solid"), Some(1));
        assert_eq!(effect_index("Blink"), Some(2));
        // Appears twice in the firmware table; the first position wins.
        assert_eq!(effect_index("Chase"), Some(14));
        assert_eq!(effect_index("Ripple"), Some(EFFECTS.len()));
        assert_eq!(effect_index("Disco Inferno"), None);
    }

    #[test]
    fn unknown_effect_is_an_error() {
        let err = Segment::new(0, 30).effect("Disco Inferno").unwrap_err();
        assert!(matches!(err, WledError::UnknownEffect(_)));
    }

    #[test]
    fn minimal_packet_omits_absent_fields() {
        let packet = serde_json::to_value(StateUpdate::new().power(true)).unwrap();
        assert_eq!(packet, json!({"on": true}));
    }

    #[test]
    fn full_packet_shape() {
        let segment = Segment::new(0, 60)
            .effect("Rainbow")
            .unwrap()
            .effect_speed(50.0)
            .effect_intensity(100.0)
            .power(true)
            .brightness(40.0)
            .palette([[100.0, 0.0, 0.0], [0.0, 100.0, 0.0], [0.0, 0.0, 100.0]]);

        let packet = serde_json::to_value(
            StateUpdate::new()
                .power(true)
                .brightness(80.0)
                .transition(700)
                .segment(segment),
        )
        .unwrap();

        assert_eq!(
            packet,
            json!({
                "on": true,
                "bri": 204,
                "transition": 700,
                "seg": [{
                    "start": 0,
                    "stop": 60,
                    "col": [[255, 0, 0], [0, 255, 0], [0, 0, 255]],
                    "fx": 10,
                    "sx": 128,
                    "ix": 255,
                    "on": true,
                    "bri": 102
                }]
            })
        );
    }
}
