use serde::Serialize;

use crate::core::ScenarioSeries;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: i32,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub datasets: Vec<ChartDataset>,
}

impl From<&ScenarioSeries> for ChartDataset {
    fn from(series: &ScenarioSeries) -> Self {
        Self {
            label: series.name.clone(),
            data: series
                .points
                .iter()
                .map(|point| ChartPoint {
                    x: point.year,
                    y: point.value,
                })
                .collect(),
        }
    }
}

/// One line per scenario on a shared linear x axis, points kept in series order.
pub fn chart_data<'a>(series: impl IntoIterator<Item = &'a ScenarioSeries>) -> ChartData {
    ChartData {
        datasets: series.into_iter().map(ChartDataset::from).collect(),
    }
}
