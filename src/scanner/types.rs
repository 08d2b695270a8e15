// SPDX-License-Identifier: GPL-3.0-only

//! Core types for scan results
//!
//! A decoded payload is classified once into a [`QrAction`] and carried as a
//! [`DecodedResult`]; [`ActionAvailability`] is derived from it for the
//! copy/share/open buttons.

use chrono::{DateTime, Local};
use url::Url;

/// A rectangular region within a frame
///
/// Coordinates are normalized (0.0 to 1.0) relative to the frame dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRegion {
    /// Left edge (0.0 = left of frame, 1.0 = right of frame)
    pub x: f32,
    /// Top edge (0.0 = top of frame, 1.0 = bottom of frame)
    pub y: f32,
    /// Width as fraction of frame width
    pub width: f32,
    /// Height as fraction of frame height
    pub height: f32,
}

impl FrameRegion {
    /// Create a frame region from pixel coordinates
    pub fn from_pixels(
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        Self {
            x: x as f32 / frame_width as f32,
            y: y as f32 / frame_height as f32,
            width: width as f32 / frame_width as f32,
            height: height as f32 / frame_height as f32,
        }
    }

    /// Whole frame
    pub fn full() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }
}

/// WiFi security type parsed from QR code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WifiSecurity {
    None,
    Wep,
    Wpa,
    Wpa2Enterprise,
    Wpa3,
}

impl WifiSecurity {
    /// Parse security type from WiFi QR code string
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "WEP" => Self::Wep,
            "WPA" | "WPA2" => Self::Wpa,
            "WPA2-EAP" | "WPA3-EAP" => Self::Wpa2Enterprise,
            "WPA3" | "SAE" => Self::Wpa3,
            "NOPASS" | "" => Self::None,
            _ => Self::Wpa,
        }
    }
}

/// Kind of payload a QR code carries
///
/// Only [`QrAction::Url`] unlocks the open action; the other kinds are shown
/// to the user so they know what they are about to copy or share.
#[derive(Debug, Clone, PartialEq)]
pub enum QrAction {
    /// http or https URL
    Url(String),

    /// WiFi network credentials
    Wifi {
        ssid: String,
        password: Option<String>,
        security: WifiSecurity,
        hidden: bool,
    },

    /// Plain text
    Text(String),

    /// Phone number (tel: URI)
    Phone(String),

    /// Email address (mailto: URI)
    Email {
        address: String,
        subject: Option<String>,
        body: Option<String>,
    },

    /// SMS message (sms: or smsto: URI)
    Sms {
        number: String,
        message: Option<String>,
    },

    /// Geographic location (geo: URI)
    Location {
        latitude: f64,
        longitude: f64,
        label: Option<String>,
    },

    /// vCard contact information
    Contact(String),

    /// Calendar event (VCALENDAR)
    Event(String),
}

impl QrAction {
    /// Classify decoded content
    ///
    /// Falls back to `Text` for unrecognized formats. Scheme-less host names
    /// stay `Text`: only explicit http/https URLs may be opened.
    pub fn parse(content: &str) -> Self {
        let trimmed = content.trim();

        if trimmed.starts_with("WIFI:") {
            return Self::parse_wifi(trimmed);
        }

        if let Some(url) = parse_web_url(trimmed) {
            return Self::Url(url.to_string());
        }

        if let Some(number) = trimmed.strip_prefix("tel:") {
            return Self::Phone(number.to_string());
        }

        if let Some(rest) = trimmed.strip_prefix("mailto:") {
            return Self::parse_mailto(rest);
        }

        if let Some(rest) = trimmed
            .strip_prefix("sms:")
            .or_else(|| trimmed.strip_prefix("smsto:"))
        {
            return Self::parse_sms(rest);
        }

        if let Some(location) = trimmed.strip_prefix("geo:").and_then(Self::parse_geo) {
            return location;
        }

        if trimmed.starts_with("BEGIN:VCARD") {
            return Self::Contact(trimmed.to_string());
        }

        if trimmed.starts_with("BEGIN:VCALENDAR") || trimmed.starts_with("BEGIN:VEVENT") {
            return Self::Event(trimmed.to_string());
        }

        Self::Text(trimmed.to_string())
    }

    /// Parse WiFi QR code format: `WIFI:T:WPA;S:network;P:password;H:true;;`
    fn parse_wifi(content: &str) -> Self {
        let mut ssid = String::new();
        let mut password = None;
        let mut security = WifiSecurity::None;
        let mut hidden = false;

        let content = content.strip_prefix("WIFI:").unwrap_or(content);
        let content = content.trim_end_matches(';');

        for part in content.split(';') {
            if let Some((key, value)) = part.split_once(':') {
                let value = value
                    .replace("\\;", ";")
                    .replace("\\:", ":")
                    .replace("\\\\", "\\")
                    .replace("\\,", ",");

                match key {
                    "S" => ssid = value,
                    "P" => password = Some(value),
                    "T" => security = WifiSecurity::parse(&value),
                    "H" => hidden = value.eq_ignore_ascii_case("true"),
                    _ => {}
                }
            }
        }

        Self::Wifi {
            ssid,
            password,
            security,
            hidden,
        }
    }

    fn parse_mailto(content: &str) -> Self {
        let (address, params) = content.split_once('?').unwrap_or((content, ""));

        let mut subject = None;
        let mut body = None;

        for (key, value) in query_pairs(params) {
            match key.to_lowercase().as_str() {
                "subject" => subject = Some(value),
                "body" => body = Some(value),
                _ => {}
            }
        }

        Self::Email {
            address: address.to_string(),
            subject,
            body,
        }
    }

    fn parse_sms(content: &str) -> Self {
        let (number, params) = content.split_once('?').unwrap_or((content, ""));

        let message = query_pairs(params)
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("body"))
            .map(|(_, value)| value);

        Self::Sms {
            number: number.to_string(),
            message,
        }
    }

    fn parse_geo(content: &str) -> Option<Self> {
        let (coords, params) = content.split_once('?').unwrap_or((content, ""));

        let mut parts = coords.split(',');
        let latitude = parts.next()?.trim().parse::<f64>().ok()?;
        let longitude = parts.next()?.trim().parse::<f64>().ok()?;

        let label = query_pairs(params)
            .into_iter()
            .find(|(key, _)| key == "q" || key == "label")
            .map(|(_, value)| value);

        Some(Self::Location {
            latitude,
            longitude,
            label,
        })
    }

    /// Short human-readable kind, shown next to the result
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Url(_) => "Link",
            Self::Wifi { .. } => "WiFi",
            Self::Text(_) => "Text",
            Self::Phone(_) => "Phone",
            Self::Email { .. } => "Email",
            Self::Sms { .. } => "SMS",
            Self::Location { .. } => "Location",
            Self::Contact(_) => "Contact",
            Self::Event(_) => "Event",
        }
    }
}

/// Split `a=1&b=2` into decoded pairs; `+` means space as in form encoding
fn query_pairs(params: &str) -> Vec<(String, String)> {
    params
        .split('&')
        .filter_map(|param| param.split_once('='))
        .map(|(key, value)| {
            let value = value.replace('+', " ");
            let value = urlencoding::decode(&value)
                .map(|v| v.into_owned())
                .unwrap_or(value);
            (key.to_string(), value)
        })
        .collect()
}

/// Parse `text` as an http or https URL with a host
pub fn parse_web_url(text: &str) -> Option<Url> {
    let url = Url::parse(text.trim()).ok()?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Some(url),
        _ => None,
    }
}

/// Whether `text` is an http or https URL
pub fn is_web_url(text: &str) -> bool {
    parse_web_url(text).is_some()
}

/// A detected QR code with its location and parsed content
#[derive(Debug, Clone, PartialEq)]
pub struct QrDetection {
    /// Bounding box of the QR code in normalized frame coordinates
    pub bounds: FrameRegion,
    /// Raw content decoded from the QR code
    pub content: String,
    /// Parsed action based on content type
    pub action: QrAction,
}

impl QrDetection {
    pub fn new(bounds: FrameRegion, content: String) -> Self {
        let action = QrAction::parse(&content);
        Self {
            bounds,
            content,
            action,
        }
    }
}

/// The result currently shown to the user
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedResult {
    /// Text exactly as decoded
    pub text: String,
    /// Classification of the text
    pub action: QrAction,
    /// Where the code was seen, if it came from a camera frame
    pub bounds: Option<FrameRegion>,
    pub scanned_at: DateTime<Local>,
}

impl DecodedResult {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            action: QrAction::parse(&text),
            text,
            bounds: None,
            scanned_at: Local::now(),
        }
    }

    /// Result from a detection, keeping its bounding box
    pub fn from_detection(detection: QrDetection) -> Self {
        Self {
            text: detection.content,
            action: detection.action,
            bounds: Some(detection.bounds),
            scanned_at: Local::now(),
        }
    }

    /// The text as a web URL, when it is one
    pub fn web_url(&self) -> Option<Url> {
        parse_web_url(&self.text)
    }

    pub fn is_web_url(&self) -> bool {
        self.web_url().is_some()
    }
}

/// Which result actions are enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionAvailability {
    pub copy: bool,
    pub share: bool,
    pub open: bool,
}

impl ActionAvailability {
    /// Derive availability from the current result
    pub fn for_result(result: Option<&DecodedResult>) -> Self {
        match result {
            Some(result) if !result.text.is_empty() => Self {
                copy: true,
                share: true,
                open: result.is_web_url(),
            },
            _ => Self::default(),
        }
    }
}
