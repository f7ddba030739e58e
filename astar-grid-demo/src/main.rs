//! Grid Pathfinding Demo
//!
//! A command-line front end over `astar-engine`: reads an ASCII map
//! (walls as `#`, start as `S`, goal as `G`), runs a single query with
//! 8-neighborhood, 5/7 Chebyshev-like edge weights, and renders the
//! resulting path and exploration heatmap back onto the map.

use std::error::Error;
use std::fmt;
use std::fs;

use clap::Parser;
use log::info;

use astar_engine::{init_logging, AstarState, Coord, Neighbor, NEIGHBOR_MAX};

const DEFAULT_MAP: &str = "\
###############################################################
#                                                             #
#                                                             #
#                                   G                         #
#                                                             #
#                                                             #
#                                                             #
#                 ###################                         #
#                 #                 #                         #
#                 #        #        #                         #
#                 #        #        #                         #
#                 #        #        #                         #
#                 #        #        #                         #
#                 #        #        #                         #
#                 ##########    #####                         #
#                                                             #
#                      S                                      #
#                                                             #
#                                                             #
#                                                             #
#                                                             #
###############################################################
";

const ORTHOGONAL: u32 = 5;
const DIAGONAL: u32 = 7;

/// Command line arguments for the grid pathfinding demo.
#[derive(Parser, Debug)]
#[clap(
    name = "A* Grid Demo",
    version = "0.1",
    about = "Runs astar-engine over an ASCII map and renders the path and heatmap"
)]
struct Args {
    /// Path to an ASCII map file (walls '#', start 'S', goal 'G').
    /// Falls back to a built-in demo map when omitted.
    #[clap(short, long)]
    map: Option<String>,

    /// Print the gray-scale exploration heatmap in addition to the path.
    #[clap(long, action, default_value = "false")]
    heatmap: bool,
}

struct Map {
    width: usize,
    height: usize,
    start: (usize, usize),
    goal: (usize, usize),
    cells: Vec<Vec<char>>,
}

#[derive(Debug)]
struct MapError(String);

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid map: {}", self.0)
    }
}

impl Error for MapError {}

impl Map {
    fn parse(text: &str) -> Result<Self, MapError> {
        let cells: Vec<Vec<char>> = text.lines().map(|line| line.chars().collect()).collect();
        let height = cells.len();
        let width = cells.iter().map(Vec::len).max().unwrap_or(0);
        if width == 0 || height == 0 {
            return Err(MapError("map is empty".into()));
        }

        let mut start = None;
        let mut goal = None;
        for (y, row) in cells.iter().enumerate() {
            for (x, &c) in row.iter().enumerate() {
                match c {
                    'S' => start = Some((x, y)),
                    'G' => goal = Some((x, y)),
                    _ => {}
                }
            }
        }
        let start = start.ok_or_else(|| MapError("no 'S' start marker found".into()))?;
        let goal = goal.ok_or_else(|| MapError("no 'G' goal marker found".into()))?;

        Ok(Self {
            width,
            height,
            start,
            goal,
            cells,
        })
    }

    fn is_wall(&self, x: usize, y: usize) -> bool {
        self.cells
            .get(y)
            .and_then(|row| row.get(x))
            .map(|&c| c == '#')
            .unwrap_or(true)
    }

    fn encode(x: usize, y: usize) -> Coord {
        Coord(((x as u32) << 16) | (y as u32))
    }

    fn decode(c: Coord) -> (usize, usize) {
        ((c.0 >> 16) as usize, (c.0 & 0xFFFF) as usize)
    }

    /// The octile heuristic matching the 5/7 edge weights: exact for an
    /// unobstructed run, a lower bound wherever walls intervene.
    fn estimate(&self, x: usize, y: usize) -> u32 {
        let dx = x.abs_diff(self.goal.0) as u32;
        let dy = y.abs_diff(self.goal.1) as u32;
        let (lo, hi) = if dx < dy { (dx, dy) } else { (dy, dx) };
        DIAGONAL * lo + ORTHOGONAL * (hi - lo)
    }

    fn neighbor_fn(&self) -> impl FnMut(Coord, &mut [Neighbor; NEIGHBOR_MAX]) -> usize + '_ {
        move |coord, out| {
            let (x, y) = Self::decode(coord);
            if self.is_wall(x, y) {
                return 0;
            }
            let mut n = 0;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx < 0 || ny < 0 || nx as usize >= self.width || ny as usize >= self.height {
                        continue;
                    }
                    let (nx, ny) = (nx as usize, ny as usize);
                    if self.is_wall(nx, ny) {
                        continue;
                    }
                    let dist = if dx != 0 && dy != 0 { DIAGONAL } else { ORTHOGONAL };
                    out[n] = Neighbor {
                        pos: Self::encode(nx, ny),
                        dist,
                        estimate: self.estimate(nx, ny),
                    };
                    n += 1;
                }
            }
            n
        }
    }

    fn render_path(&self, path: &[Coord]) -> String {
        let mut marks = vec![vec![false; self.width]; self.height];
        for &coord in path {
            let (x, y) = Self::decode(coord);
            marks[y][x] = true;
        }
        let mut out = String::new();
        for (y, row) in self.cells.iter().enumerate() {
            for x in 0..self.width {
                let c = row.get(x).copied().unwrap_or(' ');
                if c == 'S' || c == 'G' {
                    out.push(c);
                } else if marks[y][x] {
                    out.push('.');
                } else if c == '#' {
                    out.push('#');
                } else {
                    out.push(' ');
                }
            }
            out.push('\n');
        }
        out
    }

    fn render_heatmap(&self, levels: &[u8]) -> String {
        const GRAY: [char; 8] = ['.', ':', '-', '=', '+', '*', 'O', '@'];
        let mut out = String::new();
        for (y, row) in self.cells.iter().enumerate() {
            for x in 0..self.width {
                let c = row.get(x).copied().unwrap_or(' ');
                if c == '#' || c == 'S' || c == 'G' {
                    out.push(c);
                } else {
                    let level = levels[y * self.width + x];
                    if level == 0 {
                        out.push(' ');
                    } else {
                        out.push(GRAY[(level / 32) as usize]);
                    }
                }
            }
            out.push('\n');
        }
        out
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging();
    let args = Args::parse();

    let text = match &args.map {
        Some(path) => fs::read_to_string(path)?,
        None => DEFAULT_MAP.to_string(),
    };
    let map = Map::parse(&text)?;
    info!("parsed map ({} x {}) from {:?}", map.width, map.height, args.map.as_deref());

    println!("map ({} x {})", map.width, map.height);
    println!(
        "start ({}, {}) -> goal ({}, {})",
        map.start.0, map.start.1, map.goal.0, map.goal.1
    );

    let extent = map.width.max(map.height) as u32;
    let capacity = AstarState::required_capacity(extent);
    println!("state capacity = {capacity}");
    let mut state = AstarState::new(capacity)?;

    let start = Map::encode(map.start.0, map.start.1);
    let goal = Map::encode(map.goal.0, map.goal.1);
    let len = state.find(start, goal, map.neighbor_fn());
    info!("search returned length {len} (negative means budget fallback)");
    println!("path len = {len}");

    let mut path = vec![Coord::default(); len.unsigned_abs() as usize];
    state.path(&mut path);
    print!("{}", map.render_path(&path));

    if args.heatmap {
        let mut levels = vec![0u8; map.width * map.height];
        state.image(&mut levels, map.width, map.height, |c| {
            let (x, y) = Map::decode(c);
            Some((x, y))
        });
        print!("{}", map.render_heatmap(&levels));
    }

    Ok(())
}
