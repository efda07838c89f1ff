//! Line-oriented text form of a [`Grid`]
//!
//! ```text
//! pointCount boundaryCount triangleCount
//! u v spacing parent0 parent1 parent2          (pointCount lines)
//! p0 p1 p2 t0 t1 t2 circumU circumV radius^2   (triangleCount lines)
//! ```
//!
//! Parents are `-1` for boundary points and `-2` for hull points.
//! Neighbors are `-1` when unset and `-2` across a boundary side.
//! Floats use the shortest representation that parses back to the same bits.

use std::{
    fmt,
    io::{BufRead, Lines, Write},
    str::FromStr,
};

use snafu::ResultExt;

use crate::{
    geometry::Circumcircle,
    grid::{Grid, GridError, IoSnafu},
    mesher::{Neighbor, Parents, Point, Triangle},
    vec2::Vec2,
};

const UNSET: i64 = -1;
const BOUNDARY: i64 = -2;

impl Grid {
    pub fn dump<W: Write>(&self, mut writer: W) -> Result<(), GridError> {
        write!(writer, "{self}").context(IoSnafu)?;
        writer.flush().context(IoSnafu)
    }

    /// Reads a grid written by [`Grid::dump`]
    ///
    /// Only the syntax is checked; the triangulation is taken as is.
    pub fn load<R: BufRead>(reader: R) -> Result<Grid, GridError> {
        let mut records = Records {
            lines: reader.lines(),
            line: 0,
        };

        let header = records.next(3)?;
        let npoints: usize = header.parse(0)?;
        let nbnd: usize = header.parse(1)?;
        let ntriangles: usize = header.parse(2)?;
        if nbnd > npoints {
            return Err(header.error(format!(
                "{nbnd} boundary points out of {npoints} points"
            )));
        }

        let mut points = Vec::new();
        points
            .try_reserve(npoints)
            .map_err(|_| GridError::MallocError)?;
        for _ in 0..npoints {
            let record = records.next(6)?;
            let parents: [i64; 3] = [record.parse(3)?, record.parse(4)?, record.parse(5)?];
            let parents = match parents {
                [UNSET, UNSET, UNSET] => Parents::Boundary,
                [BOUNDARY, BOUNDARY, BOUNDARY] => Parents::Hull,
                [a, b, c] if a >= 0 && b >= 0 && c >= 0 => {
                    Parents::Field([a as usize, b as usize, c as usize])
                }
                _ => return Err(record.error(format!("invalid parents {parents:?}"))),
            };
            points.push(Point {
                pos: Vec2::new(record.parse(0)?, record.parse(1)?),
                spacing: record.parse(2)?,
                parents,
            });
        }

        let mut triangles = Vec::new();
        triangles
            .try_reserve(ntriangles)
            .map_err(|_| GridError::MallocError)?;
        for _ in 0..ntriangles {
            let record = records.next(9)?;
            let mut t = [Neighbor::Unset; 3];
            for (i, side) in t.iter_mut().enumerate() {
                *side = match record.parse::<i64>(3 + i)? {
                    UNSET => Neighbor::Unset,
                    BOUNDARY => Neighbor::Boundary,
                    k if k >= 0 => Neighbor::Triangle(k as usize),
                    k => return Err(record.error(format!("invalid neighbor {k}"))),
                };
            }
            triangles.push(Triangle {
                p: [record.parse(0)?, record.parse(1)?, record.parse(2)?],
                t,
                cc: Circumcircle {
                    center: Vec2::new(record.parse(6)?, record.parse(7)?),
                    radius_squared: record.parse(8)?,
                },
            });
        }

        Ok(Grid::from_parts(points, triangles, nbnd))
    }

    pub fn dump_to_string(&self) -> String {
        self.to_string()
    }

    pub fn load_from_str(text: &str) -> Result<Grid, GridError> {
        Self::load(text.as_bytes())
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {} {}",
            self.points.len(),
            self.nbnd,
            self.triangles.len()
        )?;
        for point in &self.points {
            let parents = match point.parents {
                Parents::Boundary => [UNSET; 3],
                Parents::Hull => [BOUNDARY; 3],
                Parents::Field(p) => p.map(|i| i as i64),
            };
            writeln!(
                f,
                "{} {} {} {} {} {}",
                point.pos.x, point.pos.y, point.spacing, parents[0], parents[1], parents[2]
            )?;
        }
        for triangle in &self.triangles {
            let t = triangle.t.map(|side| match side {
                Neighbor::Unset => UNSET,
                Neighbor::Boundary => BOUNDARY,
                Neighbor::Triangle(k) => k as i64,
            });
            writeln!(
                f,
                "{} {} {} {} {} {} {} {} {}",
                triangle.p[0],
                triangle.p[1],
                triangle.p[2],
                t[0],
                t[1],
                t[2],
                triangle.cc.center.x,
                triangle.cc.center.y,
                triangle.cc.radius_squared
            )?;
        }
        Ok(())
    }
}

struct Records<R> {
    lines: Lines<R>,
    line: usize,
}

impl<R: BufRead> Records<R> {
    /// Next non-empty line, which must hold exactly `count` fields
    fn next(&mut self, count: usize) -> Result<Record, GridError> {
        loop {
            self.line += 1;
            let Some(text) = self.lines.next() else {
                return Err(GridError::Parse {
                    line: self.line,
                    message: "unexpected end of input".to_string(),
                });
            };
            let text = text.context(IoSnafu)?;
            let fields: Vec<String> = text.split_whitespace().map(str::to_string).collect();
            if fields.is_empty() {
                continue;
            }
            let record = Record {
                line: self.line,
                fields,
            };
            if record.fields.len() != count {
                return Err(record.error(format!(
                    "expected {count} fields, found {}",
                    record.fields.len()
                )));
            }
            return Ok(record);
        }
    }
}

struct Record {
    line: usize,
    fields: Vec<String>,
}

impl Record {
    fn parse<T: FromStr>(&self, index: usize) -> Result<T, GridError> {
        let field = &self.fields[index];
        field
            .parse()
            .map_err(|_| self.error(format!("invalid value `{field}`")))
    }

    fn error(&self, message: String) -> GridError {
        GridError::Parse {
            line: self.line,
            message,
        }
    }
}
