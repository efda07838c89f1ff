use std::ops::{Add, Mul, Sub};

#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub(crate) struct Vec2 {
    pub(crate) x: f64,
    pub(crate) y: f64,
}

impl Vec2 {
    pub(crate) const ZERO: Vec2 = Vec2::new(0., 0.);

    pub(crate) const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub(crate) fn length_squared(&self) -> f64 {
        self.dot(*self)
    }

    pub(crate) fn length(&self) -> f64 {
        self.dot(*self).sqrt()
    }

    pub(crate) fn dot(&self, rhs: Vec2) -> f64 {
        (self.x * rhs.x) + (self.y * rhs.y)
    }

    pub(crate) fn cross(&self, rhs: Vec2) -> f64 {
        (self.x * rhs.y) - (self.y * rhs.x)
    }

    pub(crate) fn distance(&self, rhs: Vec2) -> f64 {
        (*self - rhs).length()
    }

    pub(crate) fn distance_squared(&self, rhs: Vec2) -> f64 {
        (*self - rhs).length_squared()
    }
}

impl From<[f64; 2]> for Vec2 {
    fn from(uv: [f64; 2]) -> Self {
        Self::new(uv[0], uv[1])
    }
}

impl From<Vec2> for [f64; 2] {
    fn from(v: Vec2) -> Self {
        [v.x, v.y]
    }
}

impl Add<Vec2> for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x.add(rhs.x),
            y: self.y.add(rhs.y),
        }
    }
}

impl Sub<Vec2> for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x.sub(rhs.x),
            y: self.y.sub(rhs.y),
        }
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self {
            x: self.x.mul(rhs),
            y: self.y.mul(rhs),
        }
    }
}
