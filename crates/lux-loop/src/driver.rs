//! Cursor movement.

use crate::LoopInfo;

impl LoopInfo {
    #[inline]
    fn displace(&mut self, by: isize) {
        self.cursor = self.cursor.wrapping_add_signed(by);
    }

    /// Moves to the next element (or row, or block, depending on the
    /// granularity) in traversal order.
    ///
    /// Returns the number of leading rearranged axes just completed: `0`
    /// while still inside the innermost managed axis, and
    /// [`rndim`](Self::rndim) once the whole loop has wrapped back to its
    /// start. When the caller walks every axis itself the loop is always
    /// complete.
    pub fn advance(&mut self) -> usize {
        let rndim = self.rndim();
        let boundary = self.boundary;
        if boundary >= rndim {
            return rndim;
        }
        self.displace(self.step[boundary]);
        let mut i = boundary;
        while i < rndim {
            self.coords[i] += 1;
            if self.coords[i] < self.rdims[i] {
                break;
            }
            self.coords[i] = 0;
            self.displace(self.step[i + 1]);
            i += 1;
        }
        i
    }

    /// Whether every coordinate is zero.
    #[must_use]
    pub fn is_at_start(&self) -> bool {
        self.coords.iter().all(|&c| c == 0)
    }

    /// Moves `distance` steps along rearranged axis `axis`, carrying into
    /// higher axes and borrowing from them for negative distances.
    ///
    /// Returns the index of the axis that absorbed the movement, or
    /// [`rndim`](Self::rndim) if it carried past the outermost axis (the
    /// coordinates then wrap modulo the axis sizes).
    pub fn advance_by(&mut self, axis: usize, distance: isize) -> usize {
        let rndim = self.rndim();
        if axis >= rndim {
            return rndim;
        }
        let mut carry = distance;
        let mut i = axis;
        while i < rndim {
            let size = self.rdims[i] as isize;
            let c = self.coords[i] as isize + carry;
            self.coords[i] = c.rem_euclid(size) as usize;
            carry = c.div_euclid(size);
            if carry == 0 {
                break;
            }
            i += 1;
        }
        self.cursor = self.offset_at_coords();
        i
    }

    fn offset_at_coords(&self) -> usize {
        self.origin
            + self
                .coords
                .iter()
                .zip(&self.rstride)
                .map(|(&c, &s)| c * s)
                .sum::<usize>()
    }

    /// Iterates over the storage offsets visited from the current position
    /// to the end of the loop, in traversal order.
    ///
    /// With row or block granularity only the offset at the start of each
    /// row or block is produced.
    pub fn offsets(&mut self) -> Offsets<'_> {
        Offsets {
            info: self,
            done: false,
        }
    }
}

/// Iterator returned by [`LoopInfo::offsets`].
#[derive(Debug)]
pub struct Offsets<'a> {
    info: &'a mut LoopInfo,
    done: bool,
}

impl Iterator for Offsets<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.done {
            return None;
        }
        let offset = self.info.cursor();
        self.done = self.info.advance() >= self.info.rndim();
        Some(offset)
    }
}
