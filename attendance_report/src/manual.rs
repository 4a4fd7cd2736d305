/*!

This is the long-form manual for `attendance_report` and `connectdash`.

## Input workbook

The data comes from one Excel workbook (.xlsx) with three sheets. The first row of
every sheet is the header. Column order does not matter, columns are found by name.

### `d_participantes`

One row per participant.

* `participantes` (required) the key of the participant
* `tipo` the category: `adulto`, `kids`, `teen`, `baby` or any other label
* `bairro` the neighborhood of the participant, shown on the map

### `f_presenca_connect`

One row per participant per encounter.

* `data` (required) the date of the encounter
* `participantes` (required) the key of the participant
* `presenca` (required) `presente` or `ausente`
* `tipo` the category of the participant. When present it takes precedence
  over the one of the participant sheet. At least one of the two sheets must
  carry a `tipo` column.
* `obs` a free-form tag. Only `visitante` has a meaning: it counts a visitor.

### `f_connect_info`

One row per encounter.

* `data` (required)
* `dinamica`, `tema_dinamica`, `ministro`, `tema_ministracao`, `versiculo_base`,
  `prop_local` free text shown in the summary of the encounters
* `latitude`, `longitude` the place of the encounter, shown on the map

Dates may be Excel dates or text in one of the formats `2024-01-31`,
`2024-01-31 19:30:00`, `31/01/2024`, `31-01-2024`.

## Duplicates

* A participant key listed twice: the first row is used.
* An encounter date listed twice: the first row is used.
* A participant recorded twice on the same date: both rows are kept. The
  participant is counted once in the number of unique participants, twice in
  the attendance counts.

## Date range

The caller selects a date range with two inclusive endpoints. A range with
fewer than two endpoints does not filter anything. A range in which no
encounter falls is not an error: all the numbers are zero and all the tables
are empty.

## Metrics

* unique adults, unique children (`kids`, `teen`, `baby`): distinct participants
* encounters: distinct dates
* mean adult attendance: average number of adults present per encounter,
  counting only the encounters with at least one adult present
* adult attendance rate: adult rows marked present over all adult rows, in percent

## Series and tables

* presence over time: number of people present per date. Dates where nobody was
  present do not appear (the series is not filled with zeros).
* presence by type: number of people present per date and per category.
  Participants without a category are left out of this series only.
* encounter summary: per date with someone present, the adults, children and
  visitors present along with the description of the encounter, newest first.
* who was present: every present participant per date, newest first.
* map: the distinct places (latitude, longitude, neighborhood). Encounters
  without coordinates and participants without a neighborhood are left out.
* gallery: for each date, the photo `DD-MM-YYYY.jpeg` in the photo directory,
  when it exists.

*/
