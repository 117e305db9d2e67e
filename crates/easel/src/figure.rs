// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! Plotly-compatible figure model. Serialises to the `{data, layout}` shape
//! plotly.js accepts directly.

use crate::error::Result;
use serde::{Deserialize, Serialize};

pub const ERROR_PREFIX: &str = "Error generating visualization:";
pub const DEFAULT_HINT: &str = "Try rephrasing your prompt or use a different chart type.";
const PLACEHOLDER_HEIGHT: u32 = 400;
const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisData {
    Numbers(Vec<Option<f64>>),
    Labels(Vec<String>),
}

impl AxisData {
    pub fn len(&self) -> usize {
        match self {
            AxisData::Numbers(v) => v.len(),
            AxisData::Labels(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_labels(&self) -> Option<&[String]> {
        match self {
            AxisData::Labels(v) => Some(v),
            AxisData::Numbers(_) => None,
        }
    }

    pub fn as_numbers(&self) -> Option<&[Option<f64>]> {
        match self {
            AxisData::Numbers(v) => Some(v),
            AxisData::Labels(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Marker {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<MarkerColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorscale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkerColor {
    Single(String),
    Scale(Vec<Option<f64>>),
    Categories(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Font {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<Font>,
}

impl Title {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorNumber {
    pub suffix: String,
    pub font: Font,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Bar {
        x: AxisData,
        y: Vec<Option<f64>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        marker: Option<Marker>,
    },
    Scatter {
        x: AxisData,
        y: AxisData,
        mode: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        fill: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        marker: Option<Marker>,
    },
    Heatmap {
        z: Vec<Vec<Option<f64>>>,
        x: Vec<String>,
        y: Vec<String>,
        colorscale: String,
        zmin: f64,
        zmax: f64,
    },
    Treemap {
        labels: Vec<String>,
        parents: Vec<String>,
        values: Vec<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        marker: Option<Marker>,
    },
    Indicator {
        mode: String,
        value: f64,
        title: Title,
        number: IndicatorNumber,
    },
    Box {
        y: Vec<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        x: Option<Vec<String>>,
    },
    Histogram {
        x: Vec<f64>,
        nbinsx: u32,
    },
    Pie {
        labels: Vec<String>,
        values: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickangle: Option<i32>,
}

impl Axis {
    pub fn titled(text: impl Into<String>) -> Self {
        Self {
            title: Some(Title::new(text)),
            ..Default::default()
        }
    }

    pub fn hidden() -> Self {
        Self {
            visible: Some(false),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub xref: String,
    pub yref: String,
    pub showarrow: bool,
    pub font: Font,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    pub height: u32,
    pub template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showlegend: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_bgcolor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_bgcolor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<Font>,
}

impl Layout {
    /// Plain layout with the background colors of the named template.
    pub fn themed(template: &str, height: u32) -> Self {
        let dark = template == "plotly_dark";
        Self {
            title: None,
            height,
            template: template.to_string(),
            xaxis: None,
            yaxis: None,
            annotations: Vec::new(),
            showlegend: None,
            paper_bgcolor: dark.then(|| "rgb(17,17,17)".to_string()),
            plot_bgcolor: dark.then(|| "rgb(17,17,17)".to_string()),
            font: dark.then(|| Font {
                size: None,
                color: Some("#f2f5fa".to_string()),
            }),
        }
    }
}

/// The chart object handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl Figure {
    pub fn new(data: Vec<Trace>, layout: Layout) -> Self {
        Self { data, layout }
    }

    pub fn error_placeholder(message: &str) -> Self {
        Self::error_placeholder_with_hint(message, DEFAULT_HINT)
    }

    /// Chart-shaped failure report: one centered red annotation, no axes.
    pub fn error_placeholder_with_hint(message: &str, hint: &str) -> Self {
        let mut layout = Layout::themed("plotly_dark", PLACEHOLDER_HEIGHT);
        layout.xaxis = Some(Axis::hidden());
        layout.yaxis = Some(Axis::hidden());
        layout.annotations.push(Annotation {
            text: format!("{ERROR_PREFIX}<br>{message}<br><br>{hint}"),
            x: 0.5,
            y: 0.5,
            xref: "paper".to_string(),
            yref: "paper".to_string(),
            showarrow: false,
            font: Font {
                size: Some(14),
                color: Some("red".to_string()),
            },
        });
        Self {
            data: Vec::new(),
            layout,
        }
    }

    pub fn is_error_placeholder(&self) -> bool {
        self.data.is_empty()
            && self
                .layout
                .annotations
                .first()
                .is_some_and(|a| a.text.starts_with(ERROR_PREFIX))
    }

    pub fn title(&self) -> Option<&str> {
        self.layout.title.as_ref().map(|t| t.text.as_str())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Standalone page that loads plotly.js from the CDN.
    pub fn to_html(&self) -> Result<String> {
        let json = self.to_json()?.replace("</", "<\\/");
        let title = escape_html(self.title().unwrap_or("Chart"));
        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{PLOTLY_CDN}"></script>
</head>
<body style="margin:0;background:#111111">
<div id="chart"></div>
<script>
const figure = {json};
Plotly.newPlot("chart", figure.data, figure.layout, {{responsive: true}});
</script>
</body>
</html>
"#
        ))
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
