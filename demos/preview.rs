use std::{env,
          io::{BufWriter, Write},
          fs::File,
          error::Error};
use color_blind_check::{Checker, Color, Deficiency, parse_color};
use tracing::info;
use tracing_subscriber::EnvFilter;

type Err = Box<dyn Error>;

fn table_of_colors(fh: &mut impl Write, colors: &[Color],
                   width: u32, comment: &str) -> Result<(), Err> {
    writeln!(fh, "<tr>")?;
    for c in colors {
        writeln!(fh, "  <td style=\"width: {width}px; height: 30px; \
                      background-color: {}\" title=\"{}\"></td>",
                 c.hex(), c.hex())?;
    }
    writeln!(fh, "  <td style=\"padding-left: 7px\">{comment}</td>\n</tr>")?;
    Ok(())
}

fn palette(fh: &mut impl Write, name: &str, colors: &[Color])
           -> Result<(), Err> {
    let checker = Checker::new();
    let verdict = checker.check(colors);
    info!(palette = name, %verdict, "checked");
    writeln!(fh, "<h3>{name} ({verdict})</h3>\n\
                  <table style=\"border: 0px; border-spacing: 0px\">")?;
    table_of_colors(fh, colors, 40, "normal vision")?;
    for d in Deficiency::ALL {
        let simulated: Vec<_> = colors.iter().map(|&c| d.simulate(c)).collect();
        let problematic = checker.problematic_pairs(colors, d);
        let comment = if problematic == 0 { d.to_string() }
                      else { format!("<b>{d}</b>: {problematic} confusable pair(s)") };
        table_of_colors(fh, &simulated, 40, &comment)?;
    }
    writeln!(fh, "</table>")?;
    Ok(())
}

fn main() -> Result<(), Err> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut fh = BufWriter::new(File::create("preview.html")?);
    writeln!(fh, "<html>\n\
                  <head>\n\
                  <title>Color vision preview</title>\n\
                  </head>\n\
                  <body>")?;

    // Palettes given on the command line, colors separated by spaces.
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        let palettes: [(&str, &[&str]); 5] = [
            ("Traffic light", &["#2ca02c", "#ffbf00", "#d62728"]),
            ("Red vs green", &["#f04000", "#00b020"]),
            ("Purple vs brown", &["#c000e0", "#c06020"]),
            ("Okabe-Ito", &["#e69f00", "#56b4e9", "#009e73", "#f0e442",
                            "#0072b2", "#d55e00", "#cc79a7", "#000000"]),
            ("Black and white", &["black", "white"])];
        for (name, p) in palettes {
            let colors = p.iter().map(|c| parse_color(c))
                .collect::<Result<Vec<_>, _>>()?;
            palette(&mut fh, name, &colors)?;
        }
    } else {
        for arg in &args {
            let colors = arg.split_whitespace().map(parse_color)
                .collect::<Result<Vec<_>, _>>()?;
            palette(&mut fh, arg, &colors)?;
        }
    }

    writeln!(fh, "</body>\n\
                  </html>")?;
    Ok(())
}
