use tiered_connectivity::graph::EdgeUpdate;
use tiered_connectivity::{ConnectivitySolver, FastConnectivitySolver};

fn add_edge(t: &mut impl ConnectivitySolver, u: usize, v: usize) {
    println!("Adding edge from {} to {}", u, v);
    t.update(EdgeUpdate::insert(u, v));
}

fn rem_edge(t: &mut impl ConnectivitySolver, u: usize, v: usize) {
    println!("Removing edge from {} to {}", u, v);
    t.update(EdgeUpdate::delete(u, v));
}

fn conn(t: &mut impl ConnectivitySolver, u: usize, v: usize) {
    println!(
        "Are {} and {} connected? {}",
        u,
        v,
        if t.connectivity_query(u, v) {
            "Yes"
        } else {
            "No"
        }
    );
}

fn main() {
    let mut t = FastConnectivitySolver::new(10);
    for u in 0..9 {
        t.update(EdgeUpdate::insert(u, u + 1));
    }
    println!("Created a path of length 10 (vertices 0 to 9)");
    conn(&mut t, 0, 9);
    println!("Components: {}", t.cc_query().len());
    add_edge(&mut t, 0, 9);
    rem_edge(&mut t, 4, 5);
    conn(&mut t, 0, 9);
    println!("Components: {}", t.cc_query().len());
    rem_edge(&mut t, 9, 0);
    conn(&mut t, 0, 9);
    println!("Components: {}", t.cc_query().len());
    t.end();
}
