mod common;

use common::{approx_eq, city_network, six_station_adjacency, six_station_network};
use gondola_lib::{Error, Heuristic, Node, RoadNetwork, METERS_PER_UNIT};

#[test]
fn euclidean_search_finds_cheapest_path() {
    let network = six_station_network();
    let outcome = network
        .search(0, 4, &Heuristic::Euclidean)
        .expect("search succeeds");

    assert_eq!(outcome.path, vec![0, 2, 4]);
    let cost = network.path_cost(&outcome.path).unwrap();
    let expected = (5f64.sqrt() + 3.0) * METERS_PER_UNIT;
    assert!(approx_eq(cost, expected), "cost {cost} != {expected}");

    let detour = network.path_cost(&[0, 1, 2, 4]).unwrap();
    assert!(cost < detour);

    assert_eq!(outcome.expansions, 2);
}

#[test]
fn null_heuristic_expands_more_but_agrees() {
    let network = six_station_network();
    let guided = network.search(0, 4, &Heuristic::Euclidean).unwrap();
    let uniform = network.search(0, 4, &Heuristic::Null).unwrap();

    assert_eq!(uniform.path, guided.path);
    assert_eq!(uniform.expansions, 3);
    assert!(uniform.expansions >= guided.expansions);
}

#[test]
fn start_equal_to_goal_needs_no_expansion() {
    let network = six_station_network();
    let outcome = network.search(3, 3, &Heuristic::Euclidean).unwrap();

    assert_eq!(outcome.path, vec![3]);
    assert_eq!(outcome.expansions, 0);
    assert_eq!(network.path_cost(&outcome.path).unwrap(), 0.0);
}

#[test]
fn unknown_nodes_are_rejected() {
    let network = six_station_network();
    assert!(matches!(
        network.search(0, 42, &Heuristic::Euclidean),
        Err(Error::UnknownNode { id: 42 })
    ));
    assert!(matches!(
        network.search(17, 0, &Heuristic::Null),
        Err(Error::UnknownNode { id: 17 })
    ));
}

#[test]
fn disconnected_station_is_unreachable() {
    let mut adjacency = six_station_adjacency();
    for row in adjacency.iter_mut() {
        row[5] = 0;
    }
    adjacency[5] = vec![0; 6];
    let nodes = six_station_network().nodes().to_vec();
    let network = RoadNetwork::new(nodes, &adjacency).unwrap();

    let to_island = network.search(0, 5, &Heuristic::Euclidean).unwrap();
    assert!(to_island.path.is_empty());
    assert!(!to_island.is_reachable());
    assert_eq!(to_island.expansions, 5);

    let from_island = network.search(5, 0, &Heuristic::Euclidean).unwrap();
    assert!(from_island.path.is_empty());
    assert_eq!(from_island.expansions, 1);
}

#[test]
fn repeated_searches_are_identical() {
    let network = city_network();
    let first = network.search(1, 5, &Heuristic::Euclidean).unwrap();
    let second = network.search(1, 5, &Heuristic::Euclidean).unwrap();
    assert_eq!(first, second);
}

#[test]
fn every_path_is_a_valid_chain_of_edges() {
    let network = city_network();
    for start in 0..network.len() {
        for goal in 0..network.len() {
            for heuristic in Heuristic::CANONICAL {
                let outcome = network.search(start, goal, &heuristic).unwrap();
                assert_eq!(outcome.path.first(), Some(&start));
                assert_eq!(outcome.path.last(), Some(&goal));
                for pair in outcome.path.windows(2) {
                    assert!(
                        network.is_adjacent(pair[0], pair[1]),
                        "{heuristic}: {} -> {} is not an edge",
                        pair[0],
                        pair[1]
                    );
                }
            }
        }
    }
}

#[test]
fn admissible_heuristics_agree_on_cost() {
    let network = city_network();
    for start in 0..network.len() {
        for goal in 0..network.len() {
            let guided = network.search(start, goal, &Heuristic::Euclidean).unwrap();
            let uniform = network.search(start, goal, &Heuristic::Null).unwrap();
            let guided_cost = network.path_cost(&guided.path).unwrap();
            let uniform_cost = network.path_cost(&uniform.path).unwrap();
            assert!(
                (guided_cost - uniform_cost).abs() < 1e-6,
                "{start} -> {goal}: {guided_cost} vs {uniform_cost}"
            );
            assert!(guided.expansions <= uniform.expansions);
        }
    }
}

#[test]
fn custom_heuristic_plugs_into_search() {
    fn half_euclidean(a: &gondola_lib::Point, b: &gondola_lib::Point) -> f64 {
        a.euclidean_distance(b) * METERS_PER_UNIT / 2.0
    }

    let network = six_station_network();
    let heuristic = Heuristic::Custom {
        name: "half-euclidean",
        estimate: half_euclidean,
    };
    let outcome = network.search(0, 4, &heuristic).unwrap();
    assert_eq!(outcome.path, vec![0, 2, 4]);
}

#[test]
fn neighbors_are_listed_in_id_order() {
    let network = six_station_network();
    let ids: Vec<_> = network
        .neighbors(3)
        .unwrap()
        .into_iter()
        .map(|node| node.id)
        .collect();
    assert_eq!(ids, vec![1, 4, 5]);
}

#[test]
fn path_cost_rejects_non_edges() {
    let network = six_station_network();
    assert!(matches!(
        network.path_cost(&[0, 3]),
        Err(Error::InvalidEdge { from: 0, to: 3 })
    ));
    assert_eq!(network.path_cost(&[]).unwrap(), 0.0);
}

#[test]
fn nodes_may_be_supplied_out_of_order() {
    let nodes = vec![Node::new(1, 3.0, 4.0), Node::new(0, 0.0, 0.0)];
    let network = RoadNetwork::new(nodes, &[vec![0, 1], vec![1, 0]]).unwrap();
    assert_eq!(network.node(1).unwrap().position.x, 3.0);
    assert!(approx_eq(
        network.edge_weight(0, 1).unwrap(),
        5.0 * METERS_PER_UNIT
    ));
}
