#![allow(dead_code)]

use gondola_lib::{Node, RoadNetwork};

/// Six-station network used throughout the search tests.
pub fn six_station_network() -> RoadNetwork {
    let nodes = vec![
        Node::new(0, 0.0, 0.0),
        Node::new(1, 2.0, 2.0),
        Node::new(2, 2.0, -1.0),
        Node::new(3, 5.0, 2.0),
        Node::new(4, 5.0, -1.0),
        Node::new(5, 7.0, 1.0),
    ];
    RoadNetwork::new(nodes, &six_station_adjacency()).expect("valid six-station network")
}

pub fn six_station_adjacency() -> Vec<Vec<u8>> {
    vec![
        vec![0, 1, 1, 0, 0, 0],
        vec![1, 0, 1, 1, 0, 0],
        vec![1, 1, 0, 0, 1, 0],
        vec![0, 1, 0, 0, 1, 1],
        vec![0, 0, 1, 1, 0, 0],
        vec![0, 0, 0, 1, 0, 0],
    ]
}

/// Eight stations laid over a city map, with a mix of short and long links.
pub fn city_network() -> RoadNetwork {
    let nodes = vec![
        Node::new(0, 120.0, 640.0),
        Node::new(1, 60.0, 520.0),
        Node::new(2, 210.0, 480.0),
        Node::new(3, 400.0, 430.0),
        Node::new(4, 380.0, 250.0),
        Node::new(5, 520.0, 110.0),
        Node::new(6, 610.0, 300.0),
        Node::new(7, 560.0, 600.0),
    ];
    let adjacency = vec![
        vec![0, 1, 1, 0, 0, 0, 0, 1],
        vec![1, 0, 1, 0, 0, 0, 0, 0],
        vec![1, 1, 0, 1, 1, 0, 0, 0],
        vec![0, 0, 1, 0, 1, 0, 1, 1],
        vec![0, 0, 1, 1, 0, 1, 1, 0],
        vec![0, 0, 0, 0, 1, 0, 1, 0],
        vec![0, 0, 0, 1, 1, 1, 0, 1],
        vec![1, 0, 0, 1, 0, 0, 1, 0],
    ];
    RoadNetwork::new(nodes, &adjacency).expect("valid city network")
}

/// Four stations in a straight line, 100 map units apart.
pub fn line_network() -> RoadNetwork {
    let nodes = (0..4).map(|id| Node::new(id, id as f64 * 100.0, 0.0)).collect();
    let adjacency = vec![
        vec![0, 1, 0, 0],
        vec![1, 0, 1, 0],
        vec![0, 1, 0, 1],
        vec![0, 0, 1, 0],
    ];
    RoadNetwork::new(nodes, &adjacency).expect("valid line network")
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
