mod cleanup;
mod config;
mod geometry;
mod grid;
mod io;
mod mesher;
mod recovery;
mod vec2;

pub use {
    config::GridConfig,
    grid::{Grid, GridError, GridInfo},
};

#[cfg(test)]
mod test;
