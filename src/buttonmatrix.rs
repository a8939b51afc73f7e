use embedded_hal::digital::v2::{InputPin, OutputPin};

use crate::{debounce::Debouncer, Instant};

/// Electrical level that means "selected" on a column and "closed" on a row.
///
/// With the diode cathode towards the row, columns are driven high and rows are
/// pulled down ([`ActiveLevel::High`]). A matrix built the other way round, with
/// pulled-up rows and sinking columns, uses [`ActiveLevel::Low`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum ActiveLevel {
    High,
    Low,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum MatrixError<O, I> {
    Column(O),
    Row(I),
}

/// Diode matrix scanned one column per [`step`](ButtonMatrix::step).
///
/// Scanning is pipelined: a column is selected at the end of one step and its rows
/// are read at the start of the next, which gives the lines a whole loop tick to
/// settle without any busy wait.
pub struct ButtonMatrix<OUTPIN, INPPIN, const COLS: usize, const ROWS: usize>
where
    OUTPIN: OutputPin,
    INPPIN: InputPin,
{
    cols: [OUTPIN; COLS],
    rows: [INPPIN; ROWS],
    level: ActiveLevel,
    current: usize,
}

impl<OUTPIN, INPPIN, const COLS: usize, const ROWS: usize> ButtonMatrix<OUTPIN, INPPIN, COLS, ROWS>
where
    OUTPIN: OutputPin,
    INPPIN: InputPin,
{
    /// Deselects every column, then selects column 0 for the first step.
    pub fn new(
        cols: [OUTPIN; COLS],
        rows: [INPPIN; ROWS],
        level: ActiveLevel,
    ) -> Result<Self, MatrixError<OUTPIN::Error, INPPIN::Error>> {
        let mut matrix = ButtonMatrix {
            cols,
            rows,
            level,
            current: 0,
        };
        for ci in 0..COLS {
            matrix.drive(ci, false)?;
        }
        matrix.drive(0, true)?;
        Ok(matrix)
    }

    fn drive(
        &mut self,
        col: usize,
        selected: bool,
    ) -> Result<(), MatrixError<OUTPIN::Error, INPPIN::Error>> {
        let pin = &mut self.cols[col];
        let high = selected == (self.level == ActiveLevel::High);
        if high {
            pin.set_high().map_err(MatrixError::Column)
        } else {
            pin.set_low().map_err(MatrixError::Column)
        }
    }

    fn read_rows(&self) -> Result<[bool; ROWS], MatrixError<OUTPIN::Error, INPPIN::Error>> {
        let mut raw = [false; ROWS];
        for (ri, row_pin) in self.rows.iter().enumerate() {
            raw[ri] = match self.level {
                ActiveLevel::High => row_pin.is_high(),
                ActiveLevel::Low => row_pin.is_low(),
            }
            .map_err(MatrixError::Row)?;
        }
        Ok(raw)
    }

    /// Samples the selected column into `debouncer` and moves on to the next one.
    ///
    /// Returns the rows of the sampled column whose debounced state flipped, as a
    /// bitmask. If the rows cannot be read the column stays selected and the next
    /// call retries it.
    pub fn step(
        &mut self,
        debouncer: &mut Debouncer<ROWS, COLS>,
        now: Instant,
    ) -> Result<u32, MatrixError<OUTPIN::Error, INPPIN::Error>> {
        let col = self.current;
        let raw = self.read_rows()?;
        let flipped = debouncer.update_column(col, &raw, now);

        self.drive(col, false)?;
        self.current = (col + 1) % COLS;
        self.drive(self.current, true)?;
        Ok(flipped)
    }

    /// Column the next [`step`](Self::step) samples.
    #[inline]
    pub fn current_column(&self) -> usize {
        self.current
    }

    /// Deselects every column and hands the pins back.
    #[allow(clippy::type_complexity)]
    pub fn free(
        mut self,
    ) -> Result<([OUTPIN; COLS], [INPPIN; ROWS]), MatrixError<OUTPIN::Error, INPPIN::Error>> {
        for ci in 0..COLS {
            self.drive(ci, false)?;
        }
        Ok((self.cols, self.rows))
    }
}
