use crate::errors::{EstimateError, ManualInputError};
use crate::estimate::{MonthlyProduction, MONTHS_IN_YEAR};
use std::io::{self, BufRead, StdinLock, Stdout, Write};

/// Operator-supplied values used when the production estimate cannot be fetched.
pub trait ManualEntry {
    /// Annual AC energy production in kWh, asked for after the estimate failed with `reason`.
    fn annual_energy(&mut self, reason: &EstimateError) -> Result<i64, ManualInputError>;

    /// Both monthly series, or None when the operator skips them.
    fn monthly_production(&mut self) -> Result<Option<MonthlyProduction>, ManualInputError>;
}

/// Prompts on a writer and reads answers line by line from a reader.
#[derive(Debug)]
pub struct ConsolePrompt<R, W> {
    reader: R,
    writer: W,
}

impl ConsolePrompt<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    fn ask(&mut self, prompt: &str) -> Result<String, ManualInputError> {
        write!(self.writer, "{prompt}")?;
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(ManualInputError::EndOfInput);
        }

        Ok(line.trim().to_string())
    }

    fn ask_series(
        &mut self,
        prompt: &str,
    ) -> Result<Option<[f64; MONTHS_IN_YEAR]>, ManualInputError> {
        let answer = self.ask(prompt)?;
        if answer.is_empty() {
            return Ok(None);
        }

        parse_series(&answer).map(Some)
    }
}

impl<R: BufRead, W: Write> ManualEntry for ConsolePrompt<R, W> {
    fn annual_energy(&mut self, _reason: &EstimateError) -> Result<i64, ManualInputError> {
        writeln!(
            self.writer,
            "PVWatts API error. Please look up the annual energy savings manually on PVWatts website"
        )?;

        let answer = self.ask("Manually input annual energy savings (kWh): ")?;
        answer
            .parse()
            .map_err(|_| ManualInputError::NotAnInteger(answer))
    }

    fn monthly_production(&mut self) -> Result<Option<MonthlyProduction>, ManualInputError> {
        let Some(solar_radiation) = self.ask_series(
            "Manually input monthly solar radiation (kWh/m2/day), 12 values (blank to skip): ",
        )?
        else {
            return Ok(None);
        };
        let Some(ac_energy) =
            self.ask_series("Manually input monthly AC energy (kWh), 12 values (blank to skip): ")?
        else {
            return Ok(None);
        };

        Ok(Some(MonthlyProduction {
            solar_radiation,
            ac_energy,
        }))
    }
}

/// Parses twelve values separated by commas and/or whitespace.
fn parse_series(text: &str) -> Result<[f64; MONTHS_IN_YEAR], ManualInputError> {
    let values = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|value| !value.is_empty())
        .map(|value| {
            value
                .parse::<f64>()
                .map_err(|_| ManualInputError::NotANumber(value.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    <[f64; MONTHS_IN_YEAR]>::try_from(values)
        .map_err(|values| ManualInputError::WrongMonthCount(values.len()))
}
