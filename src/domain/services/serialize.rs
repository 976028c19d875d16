use crate::domain::model::{Cluster, DemandModel, Flow, Node};
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 下游模擬使用的輸出文件，欄位名稱固定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandDocument {
    pub points: Vec<PointRecord>,
    pub pops: Vec<PopRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointRecord {
    pub id: String,
    pub location: [f64; 2],
    pub jobs: u64,
    pub residents: u64,
    pub pop_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopRecord {
    pub id: String,
    pub residence_id: String,
    pub job_id: String,
    pub size: u64,
    pub driving_distance: u64,
    pub driving_seconds: u64,
}

/// 由群集建立節點（使用實際人口而非調整後人口），
/// 並依流量順序回填每個節點的流量 ID
pub fn build_model(clusters: &[Cluster], flows: Vec<Flow>) -> DemandModel {
    let mut flow_ids: HashMap<&str, Vec<String>> = HashMap::with_capacity(clusters.len());
    for flow in &flows {
        flow_ids
            .entry(flow.origin_id.as_str())
            .or_default()
            .push(flow.id.clone());
        if flow.dest_id != flow.origin_id {
            flow_ids
                .entry(flow.dest_id.as_str())
                .or_default()
                .push(flow.id.clone());
        }
    }

    let points = clusters
        .iter()
        .map(|c| Node {
            id: c.id.clone(),
            location: c.centroid,
            jobs: c.jobs,
            residents: c.population,
            flow_ids: flow_ids.remove(c.id.as_str()).unwrap_or_default(),
        })
        .collect();

    DemandModel { points, flows }
}

impl From<&DemandModel> for DemandDocument {
    fn from(model: &DemandModel) -> Self {
        let points = model
            .points
            .iter()
            .map(|node| PointRecord {
                id: node.id.clone(),
                location: [node.location.lon, node.location.lat],
                jobs: node.jobs,
                residents: node.residents,
                pop_ids: node.flow_ids.clone(),
            })
            .collect();

        let pops = model
            .flows
            .iter()
            .map(|flow| PopRecord {
                id: flow.id.clone(),
                residence_id: flow.origin_id.clone(),
                job_id: flow.dest_id.clone(),
                size: flow.size,
                driving_distance: flow.distance_meters.round() as u64,
                driving_seconds: flow.travel_seconds.round() as u64,
            })
            .collect();

        Self { points, pops }
    }
}

pub fn to_json(model: &DemandModel, pretty: bool) -> Result<String> {
    let document = DemandDocument::from(model);
    let json = if pretty {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_json::to_string(&document)?
    };
    Ok(json)
}
