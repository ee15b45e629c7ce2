//! L-system rivers traced onto the world grid with turtle graphics.

use hashbrown::{HashMap, HashSet};

use terravox_core::coords::pack_xz;

/// The branching rewrite rule shared by every river in the world.
const STANDARD_AXIOM: &str = "F";
const STANDARD_RULE: &str = "FF-[-F+F+F]+[+F-F-F]";

/// Turtle state saved across bracketed branches.
#[derive(Clone, Copy)]
struct Turtle {
    x: f64,
    z: f64,
    heading_degrees: f64,
}

/// A river: an L-system derivation plus the set of integer cells its
/// turtle visited. Stateless after construction.
#[derive(Clone, Debug)]
pub struct River {
    axiom: String,
    rules: HashMap<char, String>,
    iterations: u32,
    angle_degrees: f64,
    step: f64,
    start: (f64, f64),
    system: String,
    cells: HashSet<i64>,
}

impl River {
    pub fn new(
        axiom: String,
        rules: HashMap<char, String>,
        iterations: u32,
        angle_degrees: f64,
        step: f64,
        start: (f64, f64),
    ) -> Self {
        let mut river = Self {
            axiom,
            rules,
            iterations,
            angle_degrees,
            step,
            start,
            system: String::new(),
            cells: HashSet::new(),
        };
        river.system = river.derive();
        river.trace();
        river
    }

    /// A river using the canonical branching rule set.
    pub fn standard(iterations: u32, angle_degrees: f64, step: f64, start: (f64, f64)) -> Self {
        let mut rules = HashMap::new();
        rules.insert('F', STANDARD_RULE.to_string());
        Self::new(
            STANDARD_AXIOM.to_string(),
            rules,
            iterations,
            angle_degrees,
            step,
            start,
        )
    }

    /// Expand the axiom through `iterations` rounds of substitution.
    fn derive(&self) -> String {
        let mut current = self.axiom.clone();
        for _ in 0..self.iterations {
            let mut next = String::with_capacity(current.len() * 2);
            for c in current.chars() {
                match self.rules.get(&c) {
                    Some(replacement) => next.push_str(replacement),
                    None => next.push(c),
                }
            }
            current = next;
        }
        current
    }

    /// Walk the derived string, marking every integer cell the turtle
    /// steps through.
    fn trace(&mut self) {
        let mut stack: Vec<Turtle> = Vec::new();
        let mut turtle = Turtle {
            x: self.start.0,
            z: self.start.1,
            heading_degrees: 0.0,
        };

        for c in self.system.chars() {
            match c {
                'F' => {
                    let radians = turtle.heading_degrees.to_radians();
                    let dx = radians.cos();
                    let dz = radians.sin();
                    let steps = self.step.round() as i64;
                    for _ in 0..steps {
                        turtle.x += dx;
                        turtle.z += dz;
                        self.cells.insert(pack_xz(
                            turtle.x.round() as i32,
                            turtle.z.round() as i32,
                        ));
                    }
                }
                '+' => turtle.heading_degrees += self.angle_degrees,
                '-' => turtle.heading_degrees -= self.angle_degrees,
                '[' => stack.push(turtle),
                ']' => {
                    if let Some(saved) = stack.pop() {
                        turtle = saved;
                    }
                }
                _ => {}
            }
        }
    }

    /// Whether the turtle marked the given world cell.
    #[inline]
    pub fn contains(&self, x: i32, z: i32) -> bool {
        self.cells.contains(&pack_xz(x, z))
    }

    /// The fully derived symbol string.
    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn angle_degrees(&self) -> f64 {
        self.angle_degrees
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn start(&self) -> (f64, f64) {
        self.start
    }
}
