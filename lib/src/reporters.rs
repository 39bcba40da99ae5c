use std::io::Write;

use tabwriter::TabWriter;

use crate::{Chart, Error, Sample};

fn span(samples: &[Sample]) -> Option<(f64, f64, f64, f64)> {
    let first = samples.first()?;
    let last = samples.last()?;
    let (lo, hi) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
            (lo.min(s.y), hi.max(s.y))
        });
    Some((first.x, last.x, lo, hi))
}

pub fn report_text(chart: &Chart, w: &mut dyn Write) -> Result<(), Error> {
    let mut tw = TabWriter::new(w);

    writeln!(tw, "Channel\tRaw\tPlotted\tTime [s]\tRange")?;
    for channel in &chart.channels {
        write!(
            tw,
            "{}\t{}\t{}\t",
            channel.name,
            channel.raw.len(),
            channel.plotted.len()
        )?;
        match span(&channel.raw) {
            Some((start, end, lo, hi)) => {
                writeln!(tw, "{:.1} - {:.1}\t{:.2} - {:.2}", start, end, lo, hi)?
            }
            None => writeln!(tw, "-\t-")?,
        }
    }

    if !chart.annotations.is_empty() {
        writeln!(tw, "\nAnnotations:")?;
        for a in &chart.annotations {
            writeln!(tw, "{:.1}s\t{}", a.x, a.label)?;
        }
    }

    tw.flush()?;
    Ok(())
}

pub fn report_json(chart: &Chart, w: &mut dyn Write) -> Result<(), Error> {
    serde_json::to_writer(&mut *w, chart)?;
    w.write_all(b"\n")?;
    Ok(())
}

pub fn report_html(chart: &Chart, w: &mut dyn Write) -> Result<(), Error> {
    // A literal "</script>" inside a string would end the inline script.
    let data = serde_json::to_string(chart)?.replace("</", "<\\/");
    let title = escape_html(&chart.title);
    w.write_all(plot_html(&title, &data).as_bytes())?;
    Ok(())
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn plot_html(title: &str, chart: &str) -> String {
    format!(
        r##"<!doctype html>
<html>
<head>
  <title>{title}</title>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <style>
    * {{ box-sizing: border-box; }}
    body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 20px; background: #0f1419; color: #e6edf3; }}
    .container {{ max-width: 1600px; margin: 0 auto; }}
    h1 {{ font-size: 24px; font-weight: 600; margin: 0 0 20px 0; }}
    .chart {{ position: relative; background: #161b22; border: 1px solid #30363d; border-radius: 8px; padding: 20px; }}
    canvas {{ width: 100%; }}
    .hover {{ position: absolute; top: 24px; right: 28px; font: 12px monospace; color: #8b949e; }}
    .legend {{ display: flex; gap: 16px; margin-top: 12px; flex-wrap: wrap; font-size: 13px; }}
    .legend-item {{ display: flex; align-items: center; gap: 6px; cursor: pointer; user-select: none; }}
    .legend-item.off {{ opacity: 0.35; }}
    .legend-dot {{ width: 10px; height: 10px; border-radius: 50%; }}
  </style>
</head>
<body>
  <div class="container">
    <h1>{title}</h1>
    <div class="chart">
      <canvas id="chart" height="500"></canvas>
      <div class="hover" id="hover"></div>
      <div class="legend" id="legend"></div>
    </div>
  </div>
  <script>
    const chart = {chart};
    const hidden = new Set();
    const pad = {{top: 30, right: 20, bottom: 50, left: 60}};
    let geom = null;

    function bounds() {{
      let xMin = Infinity, xMax = -Infinity;
      chart.channels.forEach((c, i) => {{
        if (hidden.has(i)) return;
        for (const p of c.plotted) {{
          if (p.x < xMin) xMin = p.x;
          if (p.x > xMax) xMax = p.x;
        }}
      }});
      return [xMin, xMax];
    }}

    function draw() {{
      const canvas = document.getElementById('chart');
      const ctx = canvas.getContext('2d');
      const dpr = window.devicePixelRatio || 1;
      const rect = canvas.getBoundingClientRect();
      canvas.width = rect.width * dpr;
      canvas.height = 500 * dpr;
      ctx.scale(dpr, dpr);
      const W = rect.width;
      const H = 500;
      const pw = W - pad.left - pad.right;
      const ph = H - pad.top - pad.bottom;

      ctx.clearRect(0, 0, W, H);
      const [xMin, xMax] = bounds();
      if (!isFinite(xMin)) {{ geom = null; return; }}
      geom = {{xMin, xMax, pw}};

      const xToP = x => pad.left + (x - xMin) / (xMax - xMin || 1) * pw;

      ctx.strokeStyle = '#30363d';
      ctx.lineWidth = 1;
      for (let i = 0; i <= 5; i++) {{
        const y = pad.top + (ph / 5) * i;
        ctx.beginPath(); ctx.moveTo(pad.left, y); ctx.lineTo(W - pad.right, y); ctx.stroke();
      }}

      ctx.fillStyle = '#8b949e';
      ctx.font = '11px monospace';
      ctx.textAlign = 'center';
      for (let i = 0; i <= 5; i++) {{
        const val = xMin + (i / 5) * (xMax - xMin);
        ctx.fillText(val.toFixed(1) + 's', pad.left + (pw / 5) * i, H - pad.bottom + 20);
      }}
      ctx.font = '12px sans-serif';
      ctx.fillText('Seconds', pad.left + pw / 2, H - 8);

      chart.channels.forEach((c, i) => {{
        if (hidden.has(i) || c.plotted.length === 0) return;
        const [lo, hi] = c.domain;
        const yToP = y => pad.top + ph - (y - lo) / (hi - lo || 1) * ph;
        ctx.strokeStyle = c.color;
        ctx.lineWidth = 1.5;
        ctx.beginPath();
        c.plotted.forEach((p, j) => {{
          if (j === 0) ctx.moveTo(xToP(p.x), yToP(p.y));
          else ctx.lineTo(xToP(p.x), yToP(p.y));
        }});
        ctx.stroke();
      }});

      ctx.textAlign = 'left';
      ctx.font = '11px sans-serif';
      for (const a of chart.annotations) {{
        if (a.x < xMin || a.x > xMax) continue;
        const x = xToP(a.x);
        ctx.strokeStyle = '#e6edf3';
        ctx.setLineDash([4, 4]);
        ctx.beginPath(); ctx.moveTo(x, pad.top); ctx.lineTo(x, pad.top + ph); ctx.stroke();
        ctx.setLineDash([]);
        ctx.fillStyle = '#e6edf3';
        ctx.fillText(a.label, x + 4, pad.top - 8);
      }}
    }}

    function legend() {{
      const el = document.getElementById('legend');
      el.innerHTML = '';
      chart.channels.forEach((c, i) => {{
        const div = document.createElement('div');
        div.className = 'legend-item' + (hidden.has(i) ? ' off' : '');
        const dot = document.createElement('span');
        dot.className = 'legend-dot';
        dot.style.background = c.color;
        div.appendChild(dot);
        div.appendChild(document.createTextNode(c.name));
        div.onclick = () => {{
          hidden.has(i) ? hidden.delete(i) : hidden.add(i);
          legend();
          draw();
        }};
        el.appendChild(div);
      }});
    }}

    document.getElementById('chart').addEventListener('mousemove', e => {{
      if (!geom) return;
      const rect = e.target.getBoundingClientRect();
      const frac = (e.clientX - rect.left - pad.left) / geom.pw;
      if (frac < 0 || frac > 1) return;
      const x = geom.xMin + frac * (geom.xMax - geom.xMin);
      document.getElementById('hover').textContent = x.toFixed(2) + ' seconds';
    }});

    legend();
    draw();
    window.addEventListener('resize', draw);
  </script>
</body>
</html>"##
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Annotation, Channel};

    fn chart() -> Chart {
        let mut chart = Chart::new("Flight <1>", 1000);
        chart.push(Channel::new(
            "RADAR Altitude",
            "orange",
            (0.0, 30.0),
            vec![Sample::new(0.1, 0.0), Sample::new(0.2, 30.0), Sample::new(0.3, 10.0)],
        ));
        chart.push(Channel::new("Gyroscope", "green", (-5.0, 50.0), Vec::new()));
        chart.annotations.push(Annotation {
            x: 0.2,
            label: "RADAR Apogee".to_string(),
        });
        chart
    }

    #[test]
    fn text_report() {
        let mut buf = Vec::new();
        report_text(&chart(), &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();

        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("Channel"));
        assert!(lines[1].starts_with("RADAR Altitude"));
        assert!(lines[1].contains("0.1 - 0.3"));
        assert!(lines[1].contains("0.00 - 30.00"));
        assert!(lines[2].starts_with("Gyroscope"));
        assert!(out.contains("RADAR Apogee"));
    }

    #[test]
    fn json_report_omits_raw_data() {
        let mut buf = Vec::new();
        report_json(&chart(), &mut buf).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(v["title"], "Flight <1>");
        assert_eq!(v["max_points"], 1000);
        assert_eq!(v["channels"][0]["plotted"][1]["y"], 30.0);
        assert!(v["channels"][0].get("raw").is_none());
        assert_eq!(v["annotations"][0]["label"], "RADAR Apogee");
    }

    #[test]
    fn html_report_escapes_title_and_script_data() {
        let mut c = chart();
        c.channels[1].name = "</script>".to_string();

        let mut buf = Vec::new();
        report_html(&c, &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();

        assert!(out.contains("<title>Flight &lt;1&gt;</title>"));
        assert!(out.contains("<\\/script>"));
        assert_eq!(out.matches("</script>").count(), 1);
    }
}
