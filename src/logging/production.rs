use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, FormattedFields};
use tracing_subscriber::registry::LookupSpan;

/// Plain, single line log format for log aggregation.
///
/// Renders `LEVEL target: message` followed by the enclosing spans, outermost first:
/// `[span{field=value}][inner]`.
pub struct ProductionLogFormat;

impl<S, N> FormatEvent<S, N> for ProductionLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        write!(writer, "{:<5} {}: ", metadata.level(), metadata.target())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;

        let spans = ctx
            .event_scope()
            .map(|scope| scope.from_root().collect::<Vec<_>>())
            .unwrap_or_default();
        if !spans.is_empty() {
            write!(writer, " ")?;
        }

        for span in spans {
            write!(writer, "[{}", span.name())?;
            if let Some(fields) = span.extensions().get::<FormattedFields<N>>()
                && !fields.is_empty()
            {
                write!(writer, "{{{}}}", fields)?;
            }
            write!(writer, "]")?;
        }

        writeln!(writer)
    }
}
