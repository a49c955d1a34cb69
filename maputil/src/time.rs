use std::time::Instant;

const PROGRESS_FREQUENCY_SECONDS: f64 = 0.2;

/// One level of the Timer's stack. Spans started with `start_iter` also count items.
struct Span {
    name: String,
    started_at: Instant,
    items: Option<ItemCount>,
    /// Report lines of finished children, already indented
    report: Vec<String>,
    /// Time spent in finished children
    nested_time: f64,
}

struct ItemCount {
    done: usize,
    total: usize,
    last_printed_at: Instant,
}

impl Span {
    fn new(name: String, items: Option<ItemCount>) -> Span {
        Span {
            name,
            started_at: Instant::now(),
            items,
            report: Vec::new(),
            nested_time: 0.0,
        }
    }

    fn elapsed(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    fn summary(&self) -> String {
        match self.items {
            Some(ref items) => format!(
                "{} ({})... {}",
                self.name,
                prettyprint_usize(items.total),
                prettyprint_time(self.elapsed())
            ),
            None => format!("{} took {}", self.name, prettyprint_time(self.elapsed())),
        }
    }
}

/// Times nested spans of work and reports progress through long loops via the `log` crate.
/// Notes and warnings collected along the way are repeated in a summary when the Timer is
/// dropped.
pub struct Timer {
    stack: Vec<Span>,
    report: Vec<String>,
    notes: Vec<String>,
    warnings: Vec<String>,
}

impl Timer {
    pub fn new<S: Into<String>>(name: S) -> Timer {
        let mut timer = Timer {
            stack: Vec::new(),
            report: Vec::new(),
            notes: Vec::new(),
            warnings: Vec::new(),
        };
        timer.start(name);
        timer
    }

    /// For tests and callers who don't care about the summary.
    pub fn throwaway() -> Timer {
        Timer::new("throwaway")
    }

    /// Logs immediately, and again in the summary.
    pub fn note<S: Into<String>>(&mut self, line: S) {
        let line = line.into();
        info!("{}", line);
        self.notes.push(line);
    }

    pub fn warn<S: Into<String>>(&mut self, line: S) {
        let line = line.into();
        warn!("{}", line);
        self.warnings.push(line);
    }

    pub fn warnings(&self) -> &Vec<String> {
        &self.warnings
    }

    pub fn start<S: Into<String>>(&mut self, name: S) {
        let name = name.into();
        if let Some(Span { items: Some(_), .. }) = self.stack.last() {
            panic!("Can't start({}) in the middle of counting items", name);
        }
        info!("{}...", name);
        self.stack.push(Span::new(name, None));
    }

    pub fn stop<S: Into<String>>(&mut self, name: S) {
        let name = name.into();
        match self.stack.last() {
            Some(span) if span.name == name && span.items.is_none() => {}
            _ => panic!("stop({}) doesn't match the last start", name),
        }
        self.finish_span();
    }

    /// Starts counting through `total` items; call `next` once per item. Nothing happens for an
    /// empty loop.
    pub fn start_iter<S: Into<String>>(&mut self, name: S, total: usize) {
        if total == 0 {
            return;
        }
        let name = name.into();
        if let Some(Span { items: Some(_), .. }) = self.stack.last() {
            panic!("Can't start_iter({}) in the middle of counting items", name);
        }
        self.stack.push(Span::new(
            name,
            Some(ItemCount {
                done: 0,
                total,
                last_printed_at: Instant::now(),
            }),
        ));
    }

    pub fn next(&mut self) {
        let finished = match self.stack.last_mut() {
            Some(Span {
                name,
                started_at,
                items: Some(items),
                ..
            }) => {
                items.done += 1;
                if items.done > items.total {
                    panic!("{} has more than {} items", name, items.total);
                }
                if items.done < items.total
                    && items.last_printed_at.elapsed().as_secs_f64() >= PROGRESS_FREQUENCY_SECONDS
                {
                    items.last_printed_at = Instant::now();
                    debug!(
                        "{}: {}/{}... {}",
                        name,
                        prettyprint_usize(items.done),
                        prettyprint_usize(items.total),
                        prettyprint_time(started_at.elapsed().as_secs_f64())
                    );
                }
                items.done == items.total
            }
            _ => panic!("next() called without start_iter"),
        };
        if finished {
            self.finish_span();
        }
    }

    fn finish_span(&mut self) {
        let span = match self.stack.pop() {
            Some(span) => span,
            None => return,
        };
        let elapsed = span.elapsed();
        let line = span.summary();
        info!("{}", line);

        let padding = "  ".repeat(self.stack.len());
        let mut lines = vec![format!("{}- {}", padding, line)];
        lines.extend(span.report);
        if span.nested_time != 0.0 {
            lines.push(format!(
                "  {}- ... plus {}",
                padding,
                prettyprint_time(elapsed - span.nested_time)
            ));
        }
        match self.stack.last_mut() {
            Some(parent) => {
                parent.report.extend(lines);
                parent.nested_time += elapsed;
            }
            None => self.report.extend(lines),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        // Only the outermost span should be left. Anything else means we're unwinding a panic.
        if self.stack.len() != 1 {
            if let Some(span) = self.stack.last() {
                error!("Dropping Timer during {}, due to panic?", span.name);
            }
            return;
        }
        self.finish_span();
        for line in &self.report {
            info!("{}", line);
        }

        if !self.notes.is_empty() {
            info!("{} notes:", self.notes.len());
            for line in &self.notes {
                info!("{}", line);
            }
        }
        if !self.warnings.is_empty() {
            warn!("{} warnings:", self.warnings.len());
            for line in &self.warnings {
                warn!("{}", line);
            }
        }
    }
}

/// Formats with thousands separators.
pub fn prettyprint_usize(x: usize) -> String {
    let digits = x.to_string();
    let mut result = String::new();
    for (idx, c) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

pub fn prettyprint_time(seconds: f64) -> String {
    format!("{:.4}s", seconds)
}
