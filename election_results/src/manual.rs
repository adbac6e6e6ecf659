/*!

This is the long-form manual for `election_results` and `livetally`.

## Data format

All the results are kept in one snapshot, stored as a JSON array of seats:

```json
[
  {
    "id": "tangail-1",
    "name": "Tangail-1",
    "candidates": [
      { "id": "t1-pa", "name": "Abdul Karim", "party": "People's Alliance",
        "symbol": "Boat", "color": "#16a34a" }
    ],
    "centers": [
      { "centerId": 1, "centerName": "Madhupur Government High School",
        "totalVoters": 2450, "votes": { "t1-pa": 812 }, "invalidVotes": 14,
        "isReported": true }
    ]
  }
]
```

Notes:
- `photoUrl` is optional on candidates.
- `votes` does not need an entry for every candidate. A missing entry counts as zero.
- `invalidVotes` defaults to zero when missing.

## Entry rules

A center update is accepted when the votes and the invalid votes together do not
exceed `totalVoters`. Negative numbers are read as zero. An accepted update replaces
all the votes of the center and marks it as reported.

## Configuration

`livetally` reads a JSON configuration file:

```json
{
  "remoteStore": {
    "baseUrl": "https://firestore.googleapis.com/v1/projects/my-project/databases/(default)/documents",
    "collection": "results",
    "documentId": "tangail",
    "timeoutSecs": 10
  },
  "localCache": { "path": "/var/lib/livetally", "key": "election_data_local_backup" },
  "refreshIntervalSecs": 90,
  "adminUser": "operator",
  "adminPasswordSha256": "<hex digest of the password>"
}
```

- `remoteStore` holds the shared document. The whole snapshot is written as a string
  in the `payload` field of the document at `{baseUrl}/{collection}/{documentId}`.
- `localCache` is optional. Without a `path`, the backup only lives as long as the process.
- `refreshIntervalSecs` controls how often `watch` reloads the shared document.
  Values between 60 and 120 seconds are recommended.

## Commands

* `livetally show` loads the results and prints a JSON summary. With `--reference`,
  the summary is compared with a reference file and any difference is reported.
* `livetally enter --seat tangail-1 --center 1 --vote t1-pa=812 --invalid 14` records
  the results of a center. Requires `--user` and `--password`.
* `livetally reset` puts back the built-in dataset. Requires `--user` and `--password`.
* `livetally watch` keeps reloading the results and prints the sync status.

## Sync status

- `loading`: nothing has been loaded yet.
- `idle`: the last operation succeeded, or failed for a transient reason.
- `syncing`: a save is being sent to the shared document.
- `degraded`: the shared document refused access. Results are served from the local
  backup, and local edits are kept, until access is restored.

*/
