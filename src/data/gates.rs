use super::{out_of_range, DataProvider, TrainingExample};
use crate::Result;

/// A boolean function given by its full truth table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    name: &'static str,
    input_size: usize,
    output_size: usize,
    table: &'static [(&'static [u8], &'static [u8])],
}

impl Gate {
    pub const WIRE: Gate = Gate {
        name: "Wire",
        input_size: 1,
        output_size: 1,
        table: &[(&[0], &[0]), (&[1], &[1])],
    };

    pub const NOT: Gate = Gate {
        name: "NOT",
        input_size: 1,
        output_size: 1,
        table: &[(&[0], &[1]), (&[1], &[0])],
    };

    pub const AND: Gate = Gate {
        name: "AND",
        input_size: 2,
        output_size: 1,
        table: &[
            (&[0, 0], &[0]),
            (&[0, 1], &[0]),
            (&[1, 0], &[0]),
            (&[1, 1], &[1]),
        ],
    };

    pub const NAND: Gate = Gate {
        name: "NAND",
        input_size: 2,
        output_size: 1,
        table: &[
            (&[0, 0], &[1]),
            (&[0, 1], &[1]),
            (&[1, 0], &[1]),
            (&[1, 1], &[0]),
        ],
    };

    pub const OR: Gate = Gate {
        name: "OR",
        input_size: 2,
        output_size: 1,
        table: &[
            (&[0, 0], &[0]),
            (&[0, 1], &[1]),
            (&[1, 0], &[1]),
            (&[1, 1], &[1]),
        ],
    };

    pub const NOR: Gate = Gate {
        name: "NOR",
        input_size: 2,
        output_size: 1,
        table: &[
            (&[0, 0], &[1]),
            (&[0, 1], &[0]),
            (&[1, 0], &[0]),
            (&[1, 1], &[0]),
        ],
    };

    pub const XOR: Gate = Gate {
        name: "XOR",
        input_size: 2,
        output_size: 1,
        table: &[
            (&[0, 0], &[0]),
            (&[0, 1], &[1]),
            (&[1, 0], &[1]),
            (&[1, 1], &[0]),
        ],
    };

    pub const XNOR: Gate = Gate {
        name: "XNOR",
        input_size: 2,
        output_size: 1,
        table: &[
            (&[0, 0], &[1]),
            (&[0, 1], &[0]),
            (&[1, 0], &[0]),
            (&[1, 1], &[1]),
        ],
    };

    /// Outputs are (carry, sum).
    pub const HALF_ADDER: Gate = Gate {
        name: "Half Adder",
        input_size: 2,
        output_size: 2,
        table: &[
            (&[0, 0], &[0, 0]),
            (&[0, 1], &[0, 1]),
            (&[1, 0], &[0, 1]),
            (&[1, 1], &[1, 0]),
        ],
    };

    /// Inputs are the binary digits of `0..8`, outputs are (carry, sum).
    pub const FULL_ADDER: Gate = Gate {
        name: "Full Adder",
        input_size: 3,
        output_size: 2,
        table: &[
            (&[0, 0, 0], &[0, 0]),
            (&[0, 0, 1], &[0, 1]),
            (&[0, 1, 0], &[0, 1]),
            (&[0, 1, 1], &[1, 0]),
            (&[1, 0, 0], &[0, 1]),
            (&[1, 0, 1], &[1, 0]),
            (&[1, 1, 0], &[1, 0]),
            (&[1, 1, 1], &[1, 1]),
        ],
    };

    /// Every built-in gate.
    pub const ALL: [Gate; 10] = [
        Gate::WIRE,
        Gate::NOT,
        Gate::AND,
        Gate::NAND,
        Gate::OR,
        Gate::NOR,
        Gate::XOR,
        Gate::XNOR,
        Gate::HALF_ADDER,
        Gate::FULL_ADDER,
    ];

    /// Looks a gate up by name, ignoring case, spaces, dashes and underscores.
    pub fn by_name(name: &str) -> Option<Gate> {
        let key = normalize(name);
        Self::ALL.into_iter().find(|g| normalize(g.name) == key)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// The whole truth table, in input order.
    pub fn examples(&self) -> Vec<TrainingExample> {
        self.table
            .iter()
            .map(|(x, y)| TrainingExample::new(to_floats(x), to_floats(y)))
            .collect()
    }
}

fn to_floats(bits: &[u8]) -> Vec<f32> {
    bits.iter().map(|&b| b as f32).collect()
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

impl DataProvider for Gate {
    fn input_width(&self) -> usize {
        self.input_size
    }

    fn output_width(&self) -> usize {
        self.output_size
    }

    fn len(&self) -> usize {
        self.table.len()
    }

    fn example(&self, index: usize) -> Result<TrainingExample> {
        let (x, y) = self
            .table
            .get(index)
            .ok_or_else(|| out_of_range(index, self.len()))?;
        Ok(TrainingExample::new(to_floats(x), to_floats(y)))
    }
}
